//! Comment repository for linkboard.

use sqlx::SqlitePool;

use super::comment::{Comment, NewComment};
use crate::{ForumError, Result};

const COMMENT_SELECT: &str = "SELECT c.id, c.thread_id, c.parent_id, c.author_id,
        u.username AS author_name, c.content, c.created_at, t.title AS thread_title
 FROM comments c
 JOIN users u ON u.id = c.author_id
 JOIN threads t ON t.id = c.thread_id";

/// Repository for comments.
#[derive(Debug, Clone)]
pub struct CommentRepository {
    pool: SqlitePool,
}

impl CommentRepository {
    /// Create a new CommentRepository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a new comment.
    ///
    /// The parent, when set, must belong to the same thread; callers
    /// validate this before calling, and the insert re-checks it so a
    /// mismatched pair is never stored.
    pub async fn create(&self, new_comment: &NewComment) -> Result<Comment> {
        let result = sqlx::query(
            "INSERT INTO comments (thread_id, parent_id, author_id, content)
             SELECT ?1, ?2, ?3, ?4
             WHERE ?2 IS NULL
                OR EXISTS (SELECT 1 FROM comments p WHERE p.id = ?2 AND p.thread_id = ?1)",
        )
        .bind(new_comment.thread_id)
        .bind(new_comment.parent_id)
        .bind(new_comment.author_id)
        .bind(&new_comment.content)
        .execute(&self.pool)
        .await
        .map_err(|e| ForumError::Database(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(ForumError::Validation(
                "parent comment does not belong to this thread".to_string(),
            ));
        }

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| ForumError::NotFound("comment".to_string()))
    }

    /// Get a comment by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.id = ?");
        let comment = sqlx::query_as::<_, Comment>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;

        Ok(comment)
    }

    /// List all comments of a thread, oldest first.
    pub async fn get_by_thread_id(&self, thread_id: i64) -> Result<Vec<Comment>> {
        let sql = format!("{COMMENT_SELECT} WHERE c.thread_id = ? ORDER BY c.id ASC");
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;

        Ok(comments)
    }

    /// List comments written by an author, newest first.
    pub async fn get_by_author_id(
        &self,
        author_id: i64,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Comment>> {
        let sql = format!(
            "{COMMENT_SELECT} WHERE c.author_id = ?
             ORDER BY c.created_at DESC, c.id DESC LIMIT ? OFFSET ?"
        );
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(author_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;

        Ok(comments)
    }

    /// List the newest comments across all threads.
    pub async fn get_newest(&self, limit: i64, offset: i64) -> Result<Vec<Comment>> {
        let sql =
            format!("{COMMENT_SELECT} ORDER BY c.created_at DESC, c.id DESC LIMIT ? OFFSET ?");
        let comments = sqlx::query_as::<_, Comment>(&sql)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;

        Ok(comments)
    }

    /// Count comments written by an author.
    pub async fn count_by_author_id(&self, author_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM comments WHERE author_id = ?")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRepository};
    use crate::forum::{NewThread, ThreadRepository};
    use crate::Database;

    async fn setup() -> (Database, i64, i64) {
        let db = Database::open_in_memory().await.unwrap();
        let user = UserRepository::new(db.pool().clone())
            .create(&NewUser::new("bill", "bill@acme.com", "hash"))
            .await
            .unwrap();
        let thread = ThreadRepository::new(db.pool().clone())
            .create(&NewThread::new("Story", "http://example.com", user.id))
            .await
            .unwrap();
        (db, user.id, thread.id)
    }

    #[tokio::test]
    async fn test_create_comment() {
        let (db, user_id, thread_id) = setup().await;
        let repo = CommentRepository::new(db.pool().clone());

        let comment = repo
            .create(&NewComment::new(thread_id, user_id, "Nice link"))
            .await
            .unwrap();

        assert_eq!(comment.thread_id, thread_id);
        assert_eq!(comment.parent_id, None);
        assert_eq!(comment.author_name, "bill");
        assert_eq!(comment.thread_title, "Story");
        assert_eq!(comment.content, "Nice link");
    }

    #[tokio::test]
    async fn test_create_reply() {
        let (db, user_id, thread_id) = setup().await;
        let repo = CommentRepository::new(db.pool().clone());
        let parent = repo
            .create(&NewComment::new(thread_id, user_id, "parent"))
            .await
            .unwrap();

        let reply = repo
            .create(&NewComment::new(thread_id, user_id, "child").with_parent(parent.id))
            .await
            .unwrap();

        assert_eq!(reply.thread_id, thread_id);
        assert_eq!(reply.parent_id, Some(parent.id));
    }

    #[tokio::test]
    async fn test_reply_parent_from_other_thread_rejected() {
        let (db, user_id, thread_id) = setup().await;
        let other_thread = ThreadRepository::new(db.pool().clone())
            .create(&NewThread::new("Other", "http://other.com", user_id))
            .await
            .unwrap();
        let repo = CommentRepository::new(db.pool().clone());
        let parent = repo
            .create(&NewComment::new(thread_id, user_id, "parent"))
            .await
            .unwrap();

        let result = repo
            .create(&NewComment::new(other_thread.id, user_id, "child").with_parent(parent.id))
            .await;

        assert!(matches!(result, Err(ForumError::Validation(_))));
        assert!(repo.get_by_thread_id(other_thread.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_by_id_missing() {
        let (db, _, _) = setup().await;
        let repo = CommentRepository::new(db.pool().clone());
        assert!(repo.get_by_id(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_author_and_newest() {
        let (db, user_id, thread_id) = setup().await;
        let repo = CommentRepository::new(db.pool().clone());
        for i in 0..3 {
            repo.create(&NewComment::new(thread_id, user_id, format!("comment {i}")))
                .await
                .unwrap();
        }

        let by_author = repo.get_by_author_id(user_id, 10, 0).await.unwrap();
        assert_eq!(by_author.len(), 3);
        assert_eq!(by_author[0].content, "comment 2");
        assert_eq!(repo.count_by_author_id(user_id).await.unwrap(), 3);

        let newest = repo.get_newest(2, 0).await.unwrap();
        assert_eq!(newest.len(), 2);
        assert_eq!(newest[0].content, "comment 2");
        assert_eq!(newest[1].content, "comment 1");
    }
}
