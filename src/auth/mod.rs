//! Authentication module for linkboard.
//!
//! This module provides password hashing, CSRF tokens and the
//! validation rules applied to submitted forms.

pub mod csrf;
mod password;
pub mod validation;

pub use csrf::{CsrfGenerator, DEFAULT_CSRF_TTL};
pub use password::{
    hash_password, validate_password, verify_password, PasswordError, MAX_PASSWORD_LENGTH,
    MIN_PASSWORD_LENGTH,
};
pub use validation::ValidationError;
