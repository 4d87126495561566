//! User model for linkboard.

use serde::Serialize;

use crate::auth::{hash_password, verify_password, PasswordError};

/// User entity representing a registered member.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID.
    pub id: i64,
    /// Login username (unique, case-insensitive).
    pub username: String,
    /// Email address (unique, case-insensitive).
    pub email: String,
    /// Password hash (Argon2 PHC string). Never rendered.
    #[serde(skip)]
    pub password: String,
    /// Account creation timestamp.
    pub created_at: String,
}

impl User {
    /// Check a plaintext password against the stored hash.
    ///
    /// Empty input never authenticates.
    pub fn authenticate(&self, password: &str) -> bool {
        !password.is_empty() && verify_password(password, &self.password).is_ok()
    }
}

/// Data for creating a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Login username.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Password hash (already hashed with Argon2).
    pub password: String,
}

impl NewUser {
    /// Create a new user record from an already hashed password.
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password_hash.into(),
        }
    }

    /// Create a new user record, hashing the plaintext password.
    pub fn with_plain_password(
        username: impl Into<String>,
        email: impl Into<String>,
        password: &str,
    ) -> Result<Self, PasswordError> {
        let hash = hash_password(password)?;
        Ok(Self::new(username, email, hash))
    }
}
