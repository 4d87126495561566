//! Forum module for linkboard.
//!
//! This module provides the link-discussion domain:
//! - Threads (submitted links) with derived score and comment count
//! - Comments forming a tree under each thread
//! - One vote per user and thread

mod comment;
mod comment_repository;
mod thread;
mod thread_repository;

pub use comment::{build_comment_tree, Comment, NewComment, ThreadedComment, MAX_INDENT_DEPTH};
pub use comment_repository::CommentRepository;
pub use thread::{NewThread, Thread, ThreadWithComments};
pub use thread_repository::ThreadRepository;

/// Escape `%`, `_` and the escape character itself for a `LIKE ... ESCAPE '\'` pattern.
pub(crate) fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
