//! Comment model for linkboard.

use std::collections::{HashMap, HashSet};

use serde::Serialize;

/// Comment entity as loaded from the database.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Comment {
    /// Unique comment ID.
    pub id: i64,
    /// Thread this comment belongs to.
    pub thread_id: i64,
    /// Parent comment, `None` for a top-level comment.
    pub parent_id: Option<i64>,
    /// ID of the author.
    pub author_id: i64,
    /// Username of the author.
    pub author_name: String,
    /// Comment body.
    pub content: String,
    /// Creation timestamp.
    pub created_at: String,
    /// Title of the thread, for feeds listing comments across threads.
    pub thread_title: String,
}

/// Data for creating a new comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    /// Thread to comment on.
    pub thread_id: i64,
    /// Parent comment, if this is a reply.
    pub parent_id: Option<i64>,
    /// ID of the author.
    pub author_id: i64,
    /// Comment body.
    pub content: String,
}

impl NewComment {
    /// Create a top-level comment.
    pub fn new(thread_id: i64, author_id: i64, content: impl Into<String>) -> Self {
        Self {
            thread_id,
            parent_id: None,
            author_id,
            content: content.into(),
        }
    }

    /// Make this comment a reply to `parent_id`.
    pub fn with_parent(mut self, parent_id: i64) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Reply levels that still add indentation; deeper replies line up with the last level.
pub const MAX_INDENT_DEPTH: usize = 16;

/// Pixels of indentation per reply level.
const INDENT_STEP_PX: usize = 40;

/// A comment positioned in its thread's reply tree.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadedComment {
    /// Reply level, 0 for a root comment.
    pub depth: usize,
    /// Left indentation in pixels.
    pub indent: usize,
    #[serde(flatten)]
    pub comment: Comment,
}

impl ThreadedComment {
    fn new(depth: usize, comment: Comment) -> Self {
        Self {
            depth,
            indent: depth.min(MAX_INDENT_DEPTH) * INDENT_STEP_PX,
            comment,
        }
    }
}

/// Arrange a thread's comments in reply order: every comment is followed by
/// its replies, each tagged with its depth.
///
/// Input order is kept among siblings. A comment whose parent is not part of
/// `comments` is treated as a root so it is never lost. The walk uses an
/// explicit stack, so arbitrarily deep reply chains are fine.
pub fn build_comment_tree(comments: Vec<Comment>) -> Vec<ThreadedComment> {
    let ids: HashSet<i64> = comments.iter().map(|c| c.id).collect();
    let total = comments.len();
    let mut by_parent: HashMap<Option<i64>, Vec<Comment>> = HashMap::new();
    for comment in comments {
        let parent = comment.parent_id.filter(|id| ids.contains(id));
        by_parent.entry(parent).or_default().push(comment);
    }

    let mut stack: Vec<(usize, Comment)> = by_parent
        .remove(&None)
        .unwrap_or_default()
        .into_iter()
        .rev()
        .map(|comment| (0, comment))
        .collect();
    let mut rows = Vec::with_capacity(total);
    while let Some((depth, comment)) = stack.pop() {
        if let Some(replies) = by_parent.remove(&Some(comment.id)) {
            stack.extend(replies.into_iter().rev().map(|reply| (depth + 1, reply)));
        }
        rows.push(ThreadedComment::new(depth, comment));
    }
    rows
}

#[cfg(test)]
mod tests {
    use super::*;

    fn comment(id: i64, parent_id: Option<i64>) -> Comment {
        Comment {
            id,
            thread_id: 1,
            parent_id,
            author_id: 1,
            author_name: "bill".to_string(),
            content: format!("comment {id}"),
            created_at: "2024-01-01 00:00:00".to_string(),
            thread_title: "Thread".to_string(),
        }
    }

    fn ids_and_depths(rows: &[ThreadedComment]) -> Vec<(i64, usize)> {
        rows.iter().map(|row| (row.comment.id, row.depth)).collect()
    }

    #[test]
    fn test_build_comment_tree() {
        let comments = vec![
            comment(1, None),
            comment(2, Some(1)),
            comment(3, None),
            comment(4, Some(2)),
            comment(5, Some(1)),
        ];

        let rows = build_comment_tree(comments);

        assert_eq!(
            ids_and_depths(&rows),
            vec![(1, 0), (2, 1), (4, 2), (5, 1), (3, 0)]
        );
        assert_eq!(rows[2].indent, 80);
    }

    #[test]
    fn test_orphan_becomes_root() {
        let rows = build_comment_tree(vec![comment(7, Some(99))]);
        assert_eq!(ids_and_depths(&rows), vec![(7, 0)]);
    }

    #[test]
    fn test_empty_tree() {
        assert!(build_comment_tree(Vec::new()).is_empty());
    }

    #[test]
    fn test_deep_chain_is_flat() {
        let mut comments = vec![comment(1, None)];
        comments.extend((2..=5000).map(|id| comment(id, Some(id - 1))));

        let rows = build_comment_tree(comments);

        assert_eq!(rows.len(), 5000);
        assert_eq!(rows[4999].depth, 4999);
        assert_eq!(rows[4999].indent, MAX_INDENT_DEPTH * 40);
    }

    #[test]
    fn test_row_serializes_flat() {
        let rows = build_comment_tree(vec![comment(1, None)]);
        let json = serde_json::to_value(&rows[0]).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["content"], "comment 1");
        assert_eq!(json["depth"], 0);
        assert_eq!(json["indent"], 0);
    }
}
