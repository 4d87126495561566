//! Template loader module.
//!
//! Loads every template file of a directory tree into a [`TemplateEngine`].
//! A file `comments/item.tpl.html` becomes the template `comments/item`.

use std::fs;
use std::path::{Path, PathBuf};

use super::{Result, TemplateEngine, TemplateError};

/// Default template file extension.
pub const DEFAULT_EXTENSION: &str = ".tpl.html";

/// Template loader for a directory of templates.
#[derive(Debug, Clone)]
pub struct TemplateLoader {
    base_path: PathBuf,
    extension: String,
}

impl TemplateLoader {
    /// Create a loader for `base_path` with the default extension.
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self::with_extension(base_path, DEFAULT_EXTENSION)
    }

    /// Create a loader matching files that end with `extension`.
    pub fn with_extension<P: AsRef<Path>>(base_path: P, extension: impl Into<String>) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
            extension: extension.into(),
        }
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    /// Read and parse every template into a new engine.
    pub fn load_all(&self) -> Result<TemplateEngine> {
        let mut engine = TemplateEngine::new();
        for (name, path) in self.list_templates()? {
            let content = fs::read_to_string(&path).map_err(|e| {
                TemplateError::Load(format!("Failed to read template '{name}': {e}"))
            })?;
            engine.load(name.as_str(), &content).map_err(|e| {
                TemplateError::Parse(format!("{name}: {e}"))
            })?;
        }
        tracing::debug!(
            path = %self.base_path.display(),
            count = engine.len(),
            "Templates loaded"
        );
        Ok(engine)
    }

    /// List template names and their files, sorted by name.
    pub fn list_templates(&self) -> Result<Vec<(String, PathBuf)>> {
        if !self.base_path.is_dir() {
            return Err(TemplateError::Load(format!(
                "Template directory {:?} not found",
                self.base_path
            )));
        }

        let mut templates = Vec::new();
        collect_templates_recursive(&self.base_path, "", &self.extension, &mut templates)?;
        templates.sort();
        Ok(templates)
    }
}

/// Recursively collect template names from a directory.
fn collect_templates_recursive(
    dir: &Path,
    prefix: &str,
    extension: &str,
    templates: &mut Vec<(String, PathBuf)>,
) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|e| {
        TemplateError::Load(format!("Failed to read directory {dir:?}: {e}"))
    })?;

    for entry in entries {
        let entry =
            entry.map_err(|e| TemplateError::Load(format!("Failed to read entry: {e}")))?;
        let path = entry.path();
        let file_name = entry.file_name().to_string_lossy().to_string();

        if path.is_dir() {
            let new_prefix = if prefix.is_empty() {
                file_name
            } else {
                format!("{prefix}/{file_name}")
            };
            collect_templates_recursive(&path, &new_prefix, extension, templates)?;
        } else if let Some(stem) = file_name.strip_suffix(extension) {
            let template_name = if prefix.is_empty() {
                stem.to_string()
            } else {
                format!("{prefix}/{stem}")
            };
            templates.push((template_name, path));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{TemplateContext, Value};
    use tempfile::TempDir;

    fn create_test_templates(dir: &Path) {
        fs::write(dir.join("layout.tpl.html"), "<title>{{site.title}}</title>").unwrap();
        fs::write(dir.join("home.tpl.html"), "{{> layout}}<h1>{{title}}</h1>").unwrap();
        fs::write(dir.join("notes.txt"), "not a template").unwrap();

        let comments = dir.join("comments");
        fs::create_dir_all(&comments).unwrap();
        fs::write(comments.join("item.tpl.html"), "<li>{{content}}</li>").unwrap();
    }

    #[test]
    fn test_list_templates() {
        let temp_dir = TempDir::new().unwrap();
        create_test_templates(temp_dir.path());

        let loader = TemplateLoader::new(temp_dir.path());
        let names: Vec<String> = loader
            .list_templates()
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();

        assert_eq!(names, vec!["comments/item", "home", "layout"]);
    }

    #[test]
    fn test_load_all_and_render() {
        let temp_dir = TempDir::new().unwrap();
        create_test_templates(temp_dir.path());

        let engine = TemplateLoader::new(temp_dir.path()).load_all().unwrap();
        assert_eq!(engine.len(), 3);
        assert!(engine.has_template("comments/item"));

        let mut context = TemplateContext::new();
        context.set(
            "site",
            Value::from(serde_json::json!({"title": "linkboard"})),
        );
        context.set("title", Value::string("Top"));
        assert_eq!(
            engine.render("home", &context).unwrap(),
            "<title>linkboard</title><h1>Top</h1>"
        );
    }

    #[test]
    fn test_custom_extension() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("page.hbs"), "x").unwrap();
        fs::write(temp_dir.path().join("other.tpl.html"), "y").unwrap();

        let engine = TemplateLoader::with_extension(temp_dir.path(), ".hbs")
            .load_all()
            .unwrap();
        assert!(engine.has_template("page"));
        assert!(!engine.has_template("other"));
    }

    #[test]
    fn test_missing_directory() {
        let loader = TemplateLoader::new("/nonexistent/linkboard/templates");
        assert!(matches!(loader.load_all(), Err(TemplateError::Load(_))));
    }

    #[test]
    fn test_parse_error_names_template() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("broken.tpl.html"), "{{#if x}}").unwrap();

        let err = TemplateLoader::new(temp_dir.path()).load_all().unwrap_err();
        assert!(err.to_string().contains("broken"));
    }
}
