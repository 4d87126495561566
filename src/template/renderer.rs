//! Template renderer module.
//!
//! Renders parsed template nodes with the given context.

use std::collections::HashMap;

use super::parser::Node;
use super::{escape_html, Result, TemplateContext, TemplateError, Value, MAX_PARTIAL_DEPTH};

/// Template renderer.
pub struct Renderer<'a> {
    context: &'a TemplateContext,
    partials: Option<&'a HashMap<String, Vec<Node>>>,
    depth: usize,
}

impl<'a> Renderer<'a> {
    /// Create a renderer without partials.
    pub fn new(context: &'a TemplateContext) -> Self {
        Self {
            context,
            partials: None,
            depth: 0,
        }
    }

    /// Create a renderer that resolves `{{> name}}` against `partials`.
    pub fn with_partials(
        context: &'a TemplateContext,
        partials: &'a HashMap<String, Vec<Node>>,
    ) -> Self {
        Self {
            context,
            partials: Some(partials),
            depth: 0,
        }
    }

    fn child<'b>(&self, context: &'b TemplateContext) -> Renderer<'b>
    where
        'a: 'b,
    {
        Renderer {
            context,
            partials: self.partials,
            depth: self.depth,
        }
    }

    /// Render a list of nodes to a string.
    pub fn render(&self, nodes: &[Node]) -> Result<String> {
        let mut output = String::new();
        for node in nodes {
            self.render_node(node, &mut output)?;
        }
        Ok(output)
    }

    fn render_node(&self, node: &Node, output: &mut String) -> Result<()> {
        match node {
            Node::Text(text) => output.push_str(text),
            Node::Variable(name) => output.push_str(&escape_html(&self.lookup(name))),
            Node::RawVariable(name) => output.push_str(&self.lookup(name)),
            Node::Partial(name) => output.push_str(&self.render_partial(name)?),
            Node::If {
                condition,
                then_branch,
                else_branch,
            } => {
                let branch = if self.truthy(condition) {
                    then_branch
                } else {
                    else_branch
                };
                output.push_str(&self.render(branch)?);
            }
            Node::Each {
                variable,
                item_name,
                body,
                empty,
            } => output.push_str(&self.render_each(variable, item_name.as_deref(), body, empty)?),
            Node::Unless { condition, body } => {
                if !self.truthy(condition) {
                    output.push_str(&self.render(body)?);
                }
            }
            Node::With { variable, body } => output.push_str(&self.render_with(variable, body)?),
        }
        Ok(())
    }

    /// Missing variables render as empty strings, like Handlebars.
    fn lookup(&self, name: &str) -> String {
        self.context
            .get(name)
            .map(Value::to_display_string)
            .unwrap_or_default()
    }

    fn truthy(&self, name: &str) -> bool {
        self.context.get(name).is_some_and(Value::is_truthy)
    }

    fn render_partial(&self, name: &str) -> Result<String> {
        let partials = self
            .partials
            .ok_or_else(|| TemplateError::Render(format!("No partials available for '{name}'")))?;
        let nodes = partials
            .get(name)
            .ok_or_else(|| TemplateError::NotFound(name.to_string()))?;
        if self.depth >= MAX_PARTIAL_DEPTH {
            return Err(TemplateError::Render(format!(
                "Partial nesting too deep at '{name}'"
            )));
        }

        let nested = Renderer {
            context: self.context,
            partials: self.partials,
            depth: self.depth + 1,
        };
        nested.render(nodes)
    }

    fn render_each(
        &self,
        variable: &str,
        item_name: Option<&str>,
        body: &[Node],
        empty: &[Node],
    ) -> Result<String> {
        let list = match self.context.get(variable) {
            Some(Value::List(items)) if !items.is_empty() => items,
            Some(Value::List(_)) | Some(Value::Null) | None => return self.render(empty),
            Some(_) => {
                return Err(TemplateError::Render(format!("'{variable}' is not a list")));
            }
        };

        let mut output = String::new();
        let item_var_name = item_name.unwrap_or("this");

        for (index, item) in list.iter().enumerate() {
            let mut child_context = self.context.child();
            // Object fields first so loop variables cannot be shadowed.
            if let Value::Object(obj) = item {
                for (key, value) in obj {
                    child_context.set(key.clone(), value.clone());
                }
            }
            child_context.set(item_var_name, item.clone());
            child_context.set("@index", Value::Number(index as i64));
            child_context.set("@first", Value::Bool(index == 0));
            child_context.set("@last", Value::Bool(index == list.len() - 1));

            output.push_str(&self.child(&child_context).render(body)?);
        }

        Ok(output)
    }

    fn render_with(&self, variable: &str, body: &[Node]) -> Result<String> {
        let Some(value) = self.context.get(variable).cloned() else {
            return Ok(String::new());
        };

        let mut child_context = self.context.child();
        if let Value::Object(obj) = &value {
            for (key, val) in obj {
                child_context.set(key.clone(), val.clone());
            }
        }
        child_context.set("this", value);

        self.child(&child_context).render(body)
    }
}
