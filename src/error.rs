//! Error types for linkboard.

use thiserror::Error;

/// Common error type for linkboard.
#[derive(Error, Debug)]
pub enum ForumError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant, so connectivity
    /// and query failures share one shape.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Authentication error.
    #[error("authentication error: {0}")]
    Auth(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Template error.
    #[error("template error: {0}")]
    Template(#[from] crate::template::TemplateError),

    /// Session persistence error.
    #[error("session error: {0}")]
    Session(#[from] crate::session::SessionError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for ForumError {
    fn from(e: sqlx::Error) -> Self {
        ForumError::Database(e.to_string())
    }
}

/// Result type alias for linkboard operations.
pub type Result<T> = std::result::Result<T, ForumError>;
