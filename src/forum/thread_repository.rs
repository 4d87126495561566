//! Thread repository for linkboard.
//!
//! Every read goes through `THREAD_SELECT`, which derives `score` from
//! `thread_votes` and `comment_count` from `comments`.

use sqlx::SqlitePool;

use super::comment::build_comment_tree;
use super::comment_repository::CommentRepository;
use super::escape_like;
use super::thread::{NewThread, Thread, ThreadWithComments};
use crate::{ForumError, Result};

const THREAD_SELECT: &str = "SELECT t.id, t.title, t.url, t.author_id, u.username AS author_name,
        t.created_at,
        (SELECT COUNT(*) FROM thread_votes v WHERE v.thread_id = t.id) AS score,
        (SELECT COUNT(*) FROM comments c WHERE c.thread_id = t.id) AS comment_count
 FROM threads t
 JOIN users u ON u.id = t.author_id";

/// Repository for threads and their votes.
#[derive(Debug, Clone)]
pub struct ThreadRepository {
    pool: SqlitePool,
}

impl ThreadRepository {
    /// Create a new ThreadRepository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new thread.
    ///
    /// Returns the created thread with the assigned ID.
    pub async fn create(&self, new_thread: &NewThread) -> Result<Thread> {
        let result = sqlx::query("INSERT INTO threads (title, url, author_id) VALUES (?, ?, ?)")
            .bind(&new_thread.title)
            .bind(&new_thread.url)
            .bind(new_thread.author_id)
            .execute(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| ForumError::NotFound("thread".to_string()))
    }

    /// Get a thread by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Thread>> {
        let sql = format!("{THREAD_SELECT} WHERE t.id = ?");
        let thread = sqlx::query_as::<_, Thread>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;

        Ok(thread.map(Thread::with_domain))
    }

    /// Get a thread by ID with its comments loaded in reply order.
    pub async fn get_by_id_with_comments(&self, id: i64) -> Result<Option<ThreadWithComments>> {
        let Some(thread) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let comments = CommentRepository::new(self.pool.clone())
            .get_by_thread_id(id)
            .await?;

        Ok(Some(ThreadWithComments {
            thread,
            comments: build_comment_tree(comments),
        }))
    }

    /// List threads by descending score, newest first among equal scores.
    pub async fn get_sorted_by_score(&self, limit: i64, offset: i64) -> Result<Vec<Thread>> {
        let sql = format!(
            "{THREAD_SELECT} ORDER BY score DESC, t.created_at DESC, t.id DESC LIMIT ? OFFSET ?"
        );
        self.fetch_page(&sql, None, limit, offset).await
    }

    /// List threads from newest to oldest.
    pub async fn get_newest(&self, limit: i64, offset: i64) -> Result<Vec<Thread>> {
        let sql = format!("{THREAD_SELECT} ORDER BY t.created_at DESC, t.id DESC LIMIT ? OFFSET ?");
        self.fetch_page(&sql, None, limit, offset).await
    }

    /// List threads whose URL contains `site`, newest first.
    ///
    /// `site` is matched literally: LIKE wildcards in it are escaped.
    pub async fn get_where_url_like(
        &self,
        site: &str,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Thread>> {
        let sql = format!(
            "{THREAD_SELECT} WHERE t.url LIKE ? ESCAPE '\\'
             ORDER BY t.created_at DESC, t.id DESC LIMIT ? OFFSET ?"
        );
        let pattern = format!("%{}%", escape_like(site));
        let threads = sqlx::query_as::<_, Thread>(&sql)
            .bind(pattern)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;

        Ok(threads.into_iter().map(Thread::with_domain).collect())
    }

    /// List threads submitted by an author, newest first.
    pub async fn get_by_author_id(
        &self,
        author_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Thread>> {
        let sql = format!(
            "{THREAD_SELECT} WHERE t.author_id = ?
             ORDER BY t.created_at DESC, t.id DESC LIMIT ? OFFSET ?"
        );
        self.fetch_page(&sql, Some(author_id), limit, offset).await
    }

    /// Count threads submitted by an author.
    pub async fn count_by_author_id(&self, author_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM threads WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;
        Ok(count)
    }

    /// Record a user's vote for a thread.
    ///
    /// Returns `false` when the user had already voted.
    pub async fn vote(&self, thread_id: i64, user_id: i64) -> Result<bool> {
        let result =
            sqlx::query("INSERT OR IGNORE INTO thread_votes (thread_id, user_id) VALUES (?, ?)")
                .bind(thread_id)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map_err(|e| ForumError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn fetch_page(
        &self,
        sql: &str,
        author_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Thread>> {
        let mut query = sqlx::query_as::<_, Thread>(sql);
        if let Some(author_id) = author_id {
            query = query.bind(author_id);
        }
        let threads = query
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;

        Ok(threads.into_iter().map(Thread::with_domain).collect())
    }
}
