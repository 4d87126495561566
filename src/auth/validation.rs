//! Input validation for linkboard forms.
//!
//! Usernames, email addresses, story titles, links and comment bodies are
//! checked here before any entity is built.

use thiserror::Error;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 3;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Maximum email length.
pub const MAX_EMAIL_LENGTH: usize = 254;

/// Maximum story title length.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum URL length.
pub const MAX_URL_LENGTH: usize = 2048;

/// Maximum comment length.
pub const MAX_COMMENT_LENGTH: usize = 10_000;

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Username is too short.
    #[error("username must be at least {MIN_USERNAME_LENGTH} characters")]
    UsernameTooShort,

    /// Username is too long.
    #[error("username must be at most {MAX_USERNAME_LENGTH} characters")]
    UsernameTooLong,

    /// Username contains invalid characters.
    #[error("username can only contain letters, digits, underscores and hyphens")]
    UsernameInvalidChars,

    /// Email is too long.
    #[error("email must be at most {MAX_EMAIL_LENGTH} characters")]
    EmailTooLong,

    /// Email format is invalid.
    #[error("invalid email format")]
    EmailInvalidFormat,

    /// Title is empty.
    #[error("title is required")]
    TitleEmpty,

    /// Title is too long.
    #[error("title must be at most {MAX_TITLE_LENGTH} characters")]
    TitleTooLong,

    /// URL is malformed.
    #[error("invalid url")]
    UrlInvalid,

    /// Comment is empty.
    #[error("comment cannot be empty")]
    CommentEmpty,

    /// Comment is too long.
    #[error("comment must be at most {MAX_COMMENT_LENGTH} characters")]
    CommentTooLong,
}

/// Validate a username.
///
/// Requirements:
/// - Length: 3-32 characters
/// - Characters: ASCII letters, digits, `_` and `-`
///
/// ```
/// use linkboard::auth::validation::validate_username;
///
/// assert!(validate_username("Bill_Doe").is_ok());
/// assert!(validate_username("ab").is_err());
/// ```
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    if username.len() < MIN_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooShort);
    }
    if username.len() > MAX_USERNAME_LENGTH {
        return Err(ValidationError::UsernameTooLong);
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(ValidationError::UsernameInvalidChars);
    }
    Ok(())
}

/// Validate an email address.
///
/// A single `@` with a non-empty local part and a dotted domain whose
/// labels are all non-empty. No whitespace.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::EmailTooLong);
    }
    if email.chars().any(char::is_whitespace) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    let Some((local, domain)) = email.split_once('@') else {
        return Err(ValidationError::EmailInvalidFormat);
    };
    if local.is_empty() || domain.contains('@') {
        return Err(ValidationError::EmailInvalidFormat);
    }
    if !domain.contains('.') || domain.split('.').any(str::is_empty) {
        return Err(ValidationError::EmailInvalidFormat);
    }

    Ok(())
}

/// Validate a story title (1-200 characters after trimming).
pub fn validate_title(title: &str) -> Result<(), ValidationError> {
    let title = title.trim();
    if title.is_empty() {
        return Err(ValidationError::TitleEmpty);
    }
    if title.chars().count() > MAX_TITLE_LENGTH {
        return Err(ValidationError::TitleTooLong);
    }
    Ok(())
}

/// Validate a comment body (1-10000 characters after trimming).
pub fn validate_comment(content: &str) -> Result<(), ValidationError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(ValidationError::CommentEmpty);
    }
    if content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(ValidationError::CommentTooLong);
    }
    Ok(())
}

/// Whether `raw` looks like a web link, with or without a scheme.
///
/// ```
/// use linkboard::auth::validation::is_url;
///
/// assert!(is_url("foo.com"));
/// assert!(is_url("http://baz.com/bar?id=bizz"));
/// assert!(!is_url("biz/baz"));
/// ```
pub fn is_url(raw: &str) -> bool {
    if raw.is_empty() || raw.len() > MAX_URL_LENGTH || raw.chars().any(char::is_whitespace) {
        return false;
    }

    let rest = match raw.split_once("://") {
        Some((scheme, rest)) => {
            if !scheme.eq_ignore_ascii_case("http") && !scheme.eq_ignore_ascii_case("https") {
                return false;
            }
            rest
        }
        None => raw,
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let host = authority.split(':').next().unwrap_or_default();
    if !host.contains('.') {
        return false;
    }
    let labels_ok = host.split('.').all(|label| {
        !label.is_empty() && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    if !labels_ok {
        return false;
    }

    url::Url::parse(&normalize_url(raw)).is_ok()
}

/// Prefix a scheme-less link with `http://`.
pub fn normalize_url(raw: &str) -> String {
    let lower = raw.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        raw.to_string()
    } else {
        format!("http://{raw}")
    }
}

/// Validate a submitted link and return its normalized form.
pub fn validate_url(raw: &str) -> Result<String, ValidationError> {
    let raw = raw.trim();
    if is_url(raw) {
        Ok(normalize_url(raw))
    } else {
        Err(ValidationError::UrlInvalid)
    }
}

/// Whether `goto` is a path on this site.
///
/// Protocol-relative (`//host`) and absolute links are rejected so a
/// redirect never leaves the site.
pub fn is_local_path(goto: &str) -> bool {
    goto.starts_with('/')
        && !goto.starts_with("//")
        && !goto.starts_with("/\\")
        && !goto.chars().any(|c| c.is_control() || c.is_whitespace())
}
