//! Story submission and comment replies.

use axum::http::StatusCode;
use serde::Serialize;

use crate::auth::validation::is_local_path;
use crate::forum::{Comment, NewComment, NewThread};
use crate::session::FLASH_SUCCESS;
use crate::web::container::Container;
use crate::web::error::{Failure, Outcome};
use crate::web::forms::{CommentForm, SubmissionForm, CSRF_ERROR};
use crate::ForumError;

use super::query_id;

#[derive(Serialize)]
struct SubmitView {
    title: &'static str,
    submission_form: SubmissionForm,
}

fn render_submit(c: &mut Container, mut form: SubmissionForm) -> Outcome {
    form.csrf = c.csrf_token(SubmissionForm::ACTION)?;
    c.render(
        "submit",
        &SubmitView {
            title: "Submit",
            submission_form: form,
        },
    )
}

/// `GET /submit`
pub async fn submit_page(c: &mut Container) -> Outcome {
    if c.current_user().is_none() {
        return c.redirect_to_login();
    }
    render_submit(c, SubmissionForm::default())
}

/// `POST /submit`
pub async fn submit(c: &mut Container) -> Outcome {
    let Some(user_id) = c.current_user().map(|user| user.id) else {
        return c.redirect_to_login();
    };

    let mut form = SubmissionForm::decode(&c.form());
    if !c.csrf_valid(&form.csrf, SubmissionForm::ACTION)? {
        form.errors.add("csrf", CSRF_ERROR);
    }

    if !form.is_valid() {
        c.set_status(StatusCode::BAD_REQUEST);
        return render_submit(c, form);
    }

    let thread = c
        .threads()
        .create(&NewThread::new(form.title.as_str(), form.url.as_str(), user_id))
        .await?;
    tracing::info!(thread_id = thread.id, user_id, url = %thread.url, "Story submitted");

    c.session()?
        .add_flash("Story successfully created!", FLASH_SUCCESS);
    c.redirect(&format!("/item?id={}", thread.id), StatusCode::FOUND)
}

#[derive(Serialize)]
struct CommentCreateView {
    title: &'static str,
    parent: Option<Comment>,
    comment_form: CommentForm,
    error: Option<&'static str>,
}

fn render_comment_create(
    c: &mut Container,
    parent: Option<Comment>,
    mut form: CommentForm,
    error: Option<&'static str>,
) -> Outcome {
    form.csrf = c.csrf_token(CommentForm::ACTION)?;
    c.render(
        "comment_create",
        &CommentCreateView {
            title: "Add Comment",
            parent,
            comment_form: form,
            error,
        },
    )
}

/// `GET /comment?id=&goto=`
pub async fn reply_page(c: &mut Container) -> Outcome {
    if c.current_user().is_none() {
        return c.redirect_to_login();
    }

    let parent_id = query_id(c, "id")?;
    let parent = c
        .comments()
        .get_by_id(parent_id)
        .await?
        .ok_or_else(|| Failure::not_found(format!("Comment with ID {parent_id} not found")))?;

    let goto = c.query().value("goto");
    let goto = if !goto.is_empty() && is_local_path(&goto) {
        goto
    } else {
        format!("/item?id={}", parent.thread_id)
    };

    let form = CommentForm::for_thread(parent.thread_id, Some(parent.id), goto, String::new());
    render_comment_create(c, Some(parent), form, None)
}

/// `POST /comment`, `POST /item`, `POST /thread`
pub async fn reply(c: &mut Container) -> Outcome {
    let Some(user_id) = c.current_user().map(|user| user.id) else {
        return c.redirect_to_login();
    };

    let mut form = CommentForm::decode(&c.form());
    if !c.csrf_valid(&form.csrf, CommentForm::ACTION)? {
        form.errors.add("csrf", CSRF_ERROR);
    }

    if let Some(thread_id) = form.thread_id {
        if c.threads().get_by_id(thread_id).await?.is_none() {
            form.errors.add("thread_id", "story not found");
        }
    }

    let mut parent = None;
    if let Some(parent_id) = form.parent_id {
        match c.comments().get_by_id(parent_id).await? {
            Some(comment) if Some(comment.thread_id) == form.thread_id => parent = Some(comment),
            _ => form
                .errors
                .add("parent_id", "parent comment not found in this story"),
        }
    }

    if let (true, Some(thread_id)) = (form.is_valid(), form.thread_id) {
        let mut new_comment = NewComment::new(thread_id, user_id, form.content.trim());
        if let Some(parent_id) = form.parent_id {
            new_comment = new_comment.with_parent(parent_id);
        }

        match c.comments().create(&new_comment).await {
            Ok(comment) => {
                tracing::info!(comment_id = comment.id, thread_id, user_id, "Comment created");
                c.session()?
                    .add_flash("Comment successfully created.", FLASH_SUCCESS);
                return c.redirect(&format!("{}#{}", form.goto, comment.id), StatusCode::FOUND);
            }
            Err(ForumError::Validation(message)) => form.errors.add("parent_id", message),
            Err(e) => return Err(e.into()),
        }
    }

    c.set_status(StatusCode::BAD_REQUEST);
    render_comment_create(c, parent, form, Some("Your form has errors"))
}
