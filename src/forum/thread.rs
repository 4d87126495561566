//! Thread model for linkboard.
//!
//! A thread is a submitted link. Its score and comment count are always
//! computed by the query that loads it.

use serde::Serialize;

use super::comment::ThreadedComment;

/// Thread entity as loaded from the database.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Thread {
    /// Unique thread ID.
    pub id: i64,
    /// Link title.
    pub title: String,
    /// Submitted URL.
    pub url: String,
    /// ID of the submitting user.
    pub author_id: i64,
    /// Username of the submitting user.
    pub author_name: String,
    /// Submission timestamp.
    pub created_at: String,
    /// Number of votes.
    pub score: i64,
    /// Number of comments.
    pub comment_count: i64,
    /// Host part of `url`, without a leading `www.`.
    #[sqlx(skip)]
    pub domain: String,
}

impl Thread {
    /// Fill in the derived `domain` field.
    pub(crate) fn with_domain(mut self) -> Self {
        self.domain = domain_of(&self.url).unwrap_or_default();
        self
    }
}

/// Extract the displayable host of a URL.
pub fn domain_of(raw: &str) -> Option<String> {
    let parsed = url::Url::parse(raw).ok()?;
    let host = parsed.host_str()?;
    Some(host.strip_prefix("www.").unwrap_or(host).to_string())
}

/// Data for creating a new thread.
#[derive(Debug, Clone)]
pub struct NewThread {
    /// Link title.
    pub title: String,
    /// Link URL.
    pub url: String,
    /// ID of the submitting user.
    pub author_id: i64,
}

impl NewThread {
    /// Create a new thread record.
    pub fn new(title: impl Into<String>, url: impl Into<String>, author_id: i64) -> Self {
        Self {
            title: title.into(),
            url: url.into(),
            author_id,
        }
    }
}

/// A thread together with its comments in reply order.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadWithComments {
    /// The thread itself.
    #[serde(flatten)]
    pub thread: Thread,
    /// Comments, each followed by its replies.
    pub comments: Vec<ThreadedComment>,
}
