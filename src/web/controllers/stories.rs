//! Story listings, story detail and voting.

use axum::http::StatusCode;
use serde::Serialize;

use crate::forum::{Thread, ThreadWithComments};
use crate::web::container::Container;
use crate::web::error::{Failure, Outcome};
use crate::web::forms::{CommentForm, VoteForm, CSRF_ERROR};
use crate::web::pagination::{offset, parse_page, Pagination};

use super::{query_id, ranked, Ranked};

#[derive(Serialize)]
struct ThreadListView<'a> {
    title: String,
    threads: Vec<Ranked<'a, Thread>>,
    #[serde(flatten)]
    pagination: Pagination,
}

fn render_list(
    c: &mut Container,
    title: String,
    threads: &[Thread],
    pagination: Pagination,
) -> Outcome {
    let view = ThreadListView {
        title,
        threads: ranked(threads, pagination.offset),
        pagination,
    };
    c.render("thread_list", &view)
}

/// `GET /`
pub async fn by_score(c: &mut Container) -> Outcome {
    let page = parse_page(&c.query())?;
    let limit = c.state().stories_per_page();
    let threads = c
        .threads()
        .get_sorted_by_score(limit, offset(page, limit))
        .await?;

    let pagination = Pagination::new(page, limit, threads.len()).with_more_url("/", &[]);
    render_list(c, "Top Stories".to_string(), &threads, pagination)
}

/// `GET /newest`
pub async fn newest(c: &mut Container) -> Outcome {
    let page = parse_page(&c.query())?;
    let limit = c.state().stories_per_page();
    let threads = c.threads().get_newest(limit, offset(page, limit)).await?;

    let pagination = Pagination::new(page, limit, threads.len()).with_more_url("/newest", &[]);
    render_list(c, "New Stories".to_string(), &threads, pagination)
}

/// `GET /domain?Site=`
pub async fn by_domain(c: &mut Container) -> Outcome {
    let query = c.query();
    let page = parse_page(&query)?;
    let site = query.value("Site").trim().to_string();
    if site.is_empty() {
        return Err(Failure::bad_request("missing Site parameter"));
    }

    let limit = c.state().stories_per_page();
    let threads = c
        .threads()
        .get_where_url_like(&site, limit, offset(page, limit))
        .await?;

    let pagination = Pagination::new(page, limit, threads.len())
        .with_more_url("/domain", &[("Site", site.as_str())]);
    render_list(c, format!("Stories from {site}"), &threads, pagination)
}

/// `GET /submitted?id=`
pub async fn by_author(c: &mut Container) -> Outcome {
    let author_id = query_id(c, "id")?;
    let page = parse_page(&c.query())?;
    let author = c
        .users()
        .get_by_id(author_id)
        .await?
        .ok_or_else(|| Failure::not_found(format!("User with ID {author_id} not found")))?;

    let limit = c.state().stories_per_page();
    let threads = c
        .threads()
        .get_by_author_id(author.id, limit, offset(page, limit))
        .await?;

    let id = author.id.to_string();
    let pagination = Pagination::new(page, limit, threads.len())
        .with_more_url("/submitted", &[("id", id.as_str())]);
    render_list(
        c,
        format!("{}'s submissions", author.username),
        &threads,
        pagination,
    )
}

#[derive(Serialize)]
struct ThreadShowView {
    title: String,
    thread: ThreadWithComments,
    comment_form: CommentForm,
}

/// `GET /item?id=`, `GET /thread?id=`
pub async fn show(c: &mut Container) -> Outcome {
    let thread_id = query_id(c, "id")?;
    let thread = c
        .threads()
        .get_by_id_with_comments(thread_id)
        .await?
        .ok_or_else(|| Failure::not_found(format!("Thread with ID {thread_id} not found")))?;

    let csrf = c.csrf_token(CommentForm::ACTION)?;
    let goto = format!("/item?id={}", thread.thread.id);
    let view = ThreadShowView {
        title: thread.thread.title.clone(),
        comment_form: CommentForm::for_thread(thread.thread.id, None, goto, csrf),
        thread,
    };
    c.render("thread_show", &view)
}

/// `POST /vote`
pub async fn vote(c: &mut Container) -> Outcome {
    let Some(user_id) = c.current_user().map(|user| user.id) else {
        return c.redirect_to_login();
    };

    let form = VoteForm::decode(&c.form());
    if !c.csrf_valid(&form.csrf, VoteForm::ACTION)? {
        return Err(Failure::bad_request(CSRF_ERROR));
    }
    let Some(thread_id) = form.thread_id.filter(|_| form.is_valid()) else {
        return Err(Failure::bad_request("a story is required"));
    };

    if c.threads().get_by_id(thread_id).await?.is_none() {
        return Err(Failure::not_found(format!(
            "Thread with ID {thread_id} not found"
        )));
    }

    if c.threads().vote(thread_id, user_id).await? {
        tracing::info!(thread_id, user_id, "Vote recorded");
    } else {
        tracing::debug!(thread_id, user_id, "Duplicate vote ignored");
    }
    c.redirect(&form.goto, StatusCode::FOUND)
}
