//! User repository for linkboard.

use sqlx::SqlitePool;

use super::user::{NewUser, User};
use crate::{ForumError, Result};

const USER_COLUMNS: &str = "id, username, email, password, created_at";

/// Repository for user persistence.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    /// Create a new UserRepository over the given pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Save a new user.
    ///
    /// A username or email that is already taken yields
    /// `ForumError::Validation` and leaves the table untouched.
    pub async fn create(&self, new_user: &NewUser) -> Result<User> {
        let result = sqlx::query("INSERT INTO users (username, email, password) VALUES (?, ?, ?)")
            .bind(&new_user.username)
            .bind(&new_user.email)
            .bind(&new_user.password)
            .execute(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                    ForumError::Validation("username or email already taken".to_string())
                }
                other => ForumError::Database(other.to_string()),
            })?;

        self.get_by_id(result.last_insert_rowid())
            .await?
            .ok_or_else(|| ForumError::NotFound("user".to_string()))
    }

    /// Get a user by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Get a user by username (case-insensitive).
    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE username = ? COLLATE NOCASE");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(username)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Get a user by email (case-insensitive).
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ? COLLATE NOCASE");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;

        Ok(user)
    }

    /// Count registered users.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| ForumError::Database(e.to_string()))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;

    async fn setup_db() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test]
    async fn test_create_user() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool().clone());

        let user = repo
            .create(&NewUser::new("johnny_doe", "johnny@acme.com", "hash"))
            .await
            .unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.username, "johnny_doe");
        assert_eq!(user.email, "johnny@acme.com");
        assert!(!user.created_at.is_empty());
    }

    #[tokio::test]
    async fn test_get_by_id_missing() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool().clone());

        assert!(repo.get_by_id(42).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_username_case_insensitive() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool().clone());
        repo.create(&NewUser::new("Bill_Doe", "bill@acme.com", "hash"))
            .await
            .unwrap();

        let found = repo.get_by_username("bill_doe").await.unwrap().unwrap();
        assert_eq!(found.username, "Bill_Doe");
        assert!(repo.get_by_username("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_by_email() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool().clone());
        repo.create(&NewUser::new("bill", "Bill@Acme.com", "hash"))
            .await
            .unwrap();

        assert!(repo.get_by_email("bill@acme.com").await.unwrap().is_some());
        assert!(repo.get_by_email("jane@acme.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_is_validation_error() {
        let db = setup_db().await;
        let repo = UserRepository::new(db.pool().clone());
        repo.create(&NewUser::new("bill", "bill@acme.com", "hash"))
            .await
            .unwrap();

        let result = repo
            .create(&NewUser::new("BILL", "other@acme.com", "hash"))
            .await;
        assert!(matches!(result, Err(ForumError::Validation(_))));

        let result = repo
            .create(&NewUser::new("other", "bill@acme.com", "hash"))
            .await;
        assert!(matches!(result, Err(ForumError::Validation(_))));

        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
