//! Failure kinds for the HTML front end.
//!
//! A controller either succeeds, fails with an HTTP status that is rendered
//! as an error page ([`Failure::Http`]), or hits an infrastructure problem
//! that aborts the request ([`Failure::Fatal`]).

use axum::http::StatusCode;
use thiserror::Error;

use crate::session::SessionError;
use crate::template::TemplateError;
use crate::ForumError;

/// Unrecoverable infrastructure failure.
#[derive(Error, Debug)]
#[error("{0}")]
pub struct Fatal(String);

impl Fatal {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }

    pub fn message(&self) -> &str {
        &self.0
    }
}

impl From<SessionError> for Fatal {
    fn from(err: SessionError) -> Self {
        Fatal(format!("session: {err}"))
    }
}

/// Why a controller did not complete.
#[derive(Debug)]
pub enum Failure {
    /// Recoverable failure answered with `status` and an error page.
    Http { status: StatusCode, message: String },
    /// Infrastructure failure.
    Fatal(Fatal),
}

impl Failure {
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        Failure::Http {
            status,
            message: message.into(),
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::http(StatusCode::BAD_REQUEST, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::http(StatusCode::NOT_FOUND, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::http(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    /// Status the failure will be answered with.
    pub fn status(&self) -> StatusCode {
        match self {
            Failure::Http { status, .. } => *status,
            Failure::Fatal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Http { status, message } => write!(f, "{} {}", status.as_u16(), message),
            Failure::Fatal(fatal) => write!(f, "fatal: {fatal}"),
        }
    }
}

impl From<Fatal> for Failure {
    fn from(fatal: Fatal) -> Self {
        Failure::Fatal(fatal)
    }
}

impl From<ForumError> for Failure {
    fn from(err: ForumError) -> Self {
        match err {
            ForumError::NotFound(_) => Failure::not_found(err.to_string()),
            other => Failure::internal(other.to_string()),
        }
    }
}

impl From<TemplateError> for Failure {
    fn from(err: TemplateError) -> Self {
        Failure::internal(err.to_string())
    }
}

/// Result of a controller.
pub type Outcome = Result<(), Failure>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forum_error_mapping() {
        let failure: Failure = ForumError::NotFound("thread".to_string()).into();
        assert_eq!(failure.status(), StatusCode::NOT_FOUND);

        let failure: Failure = ForumError::Database("locked".to_string()).into();
        assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(matches!(failure, Failure::Http { .. }));

        let failure: Failure = ForumError::Validation("taken".to_string()).into();
        assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_fatal_is_disjoint() {
        let failure: Failure = Fatal::new("store poisoned").into();
        assert!(matches!(failure, Failure::Fatal(_)));
        assert_eq!(failure.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure.to_string(), "fatal: store poisoned");
    }

    #[test]
    fn test_session_error_is_fatal() {
        let fatal: Fatal = SessionError::StorePoisoned.into();
        assert!(fatal.message().contains("poisoned"));
    }

    #[test]
    fn test_display_http() {
        assert_eq!(Failure::bad_request("bad page").to_string(), "400 bad page");
        assert_eq!(Failure::not_found("gone").status(), StatusCode::NOT_FOUND);
    }
}
