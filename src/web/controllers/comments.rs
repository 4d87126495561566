//! Comment feeds.

use serde::Serialize;

use crate::db::User;
use crate::forum::Comment;
use crate::web::container::Container;
use crate::web::error::{Failure, Outcome};
use crate::web::pagination::{offset, parse_page, Pagination};

use super::{query_id, ranked, Ranked};

#[derive(Serialize)]
struct CommentListView<'a> {
    title: String,
    author: Option<User>,
    comments: Vec<Ranked<'a, Comment>>,
    #[serde(flatten)]
    pagination: Pagination,
}

/// `GET /newcomments`
pub async fn newest(c: &mut Container) -> Outcome {
    let page = parse_page(&c.query())?;
    let limit = c.state().stories_per_page();
    let comments = c.comments().get_newest(limit, offset(page, limit)).await?;

    let pagination =
        Pagination::new(page, limit, comments.len()).with_more_url("/newcomments", &[]);
    let view = CommentListView {
        title: "New Comments".to_string(),
        author: None,
        comments: ranked(&comments, pagination.offset),
        pagination,
    };
    c.render("comments_list", &view)
}

/// `GET /threads?id=`
pub async fn by_author(c: &mut Container) -> Outcome {
    let author_id = query_id(c, "id")?;
    let page = parse_page(&c.query())?;
    let author = c
        .users()
        .get_by_id(author_id)
        .await?
        .ok_or_else(|| Failure::not_found(format!("User with ID {author_id} not found")))?;

    let limit = c.state().stories_per_page();
    let comments = c
        .comments()
        .get_by_author_id(author.id, limit, offset(page, limit))
        .await?;

    let id = author.id.to_string();
    let pagination = Pagination::new(page, limit, comments.len())
        .with_more_url("/threads", &[("id", id.as_str())]);
    let view = CommentListView {
        title: format!("{}'s comments", author.username),
        author: Some(author),
        comments: ranked(&comments, pagination.offset),
        pagination,
    };
    c.render("comments_list", &view)
}
