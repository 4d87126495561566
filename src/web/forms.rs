//! Form decoding.
//!
//! Each form has an explicit `decode` that reads its `<form>_<field>` inputs,
//! checks presence and shape, and records per-field errors. CSRF and
//! database checks are added by the controllers before anything is written.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::auth::validation::{
    is_local_path, validate_comment, validate_email, validate_title, validate_url,
    validate_username,
};
use crate::auth::{validate_password, ValidationError};

/// Decoded `application/x-www-form-urlencoded` pairs.
#[derive(Debug, Clone, Default)]
pub struct FormData {
    pairs: Vec<(String, String)>,
}

impl FormData {
    pub fn parse(input: &[u8]) -> Self {
        Self {
            pairs: url::form_urlencoded::parse(input).into_owned().collect(),
        }
    }

    /// First value of `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// First value of `name`, or an empty string.
    pub fn value(&self, name: &str) -> String {
        self.get(name).unwrap_or_default().to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Field name to error messages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FormErrors(BTreeMap<String, Vec<String>>);

impl FormErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    fn check(&mut self, field: &str, result: Result<(), ValidationError>) {
        if let Err(e) = result {
            self.add(field, e.to_string());
        }
    }
}

pub const CSRF_ERROR: &str = "The form has expired, please submit it again";

fn parse_id(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|id| *id > 0)
}

/// `login_*` fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoginForm {
    pub username: String,
    #[serde(skip)]
    pub password: String,
    pub csrf: String,
    pub errors: FormErrors,
}

impl LoginForm {
    pub const ACTION: &'static str = "login";

    pub fn decode(data: &FormData) -> Self {
        let mut form = Self {
            username: data.value("login_username").trim().to_string(),
            password: data.value("login_password"),
            csrf: data.value("login_csrf"),
            errors: FormErrors::default(),
        };
        if form.username.is_empty() {
            form.errors.add("username", "username is required");
        }
        if form.password.is_empty() {
            form.errors.add("password", "password is required");
        }
        form
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// `registration_*` fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    #[serde(skip)]
    pub password: String,
    #[serde(skip)]
    pub password_confirmation: String,
    pub csrf: String,
    pub errors: FormErrors,
}

impl RegistrationForm {
    pub const ACTION: &'static str = "registration";

    pub fn decode(data: &FormData) -> Self {
        let mut form = Self {
            username: data.value("registration_username").trim().to_string(),
            email: data.value("registration_email").trim().to_string(),
            password: data.value("registration_password"),
            password_confirmation: data.value("registration_password_confirmation"),
            csrf: data.value("registration_csrf"),
            errors: FormErrors::default(),
        };
        form.errors.check("username", validate_username(&form.username));
        form.errors.check("email", validate_email(&form.email));
        if let Err(e) = validate_password(&form.password) {
            form.errors.add("password", e.to_string());
        }
        if form.password != form.password_confirmation {
            form.errors
                .add("password_confirmation", "passwords do not match");
        }
        form
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// `submission_*` fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SubmissionForm {
    pub title: String,
    pub url: String,
    pub csrf: String,
    pub errors: FormErrors,
}

impl SubmissionForm {
    pub const ACTION: &'static str = "submission";

    /// Decode the form; a valid `url` is replaced by its normalized form.
    pub fn decode(data: &FormData) -> Self {
        let mut form = Self {
            title: data.value("submission_title").trim().to_string(),
            url: data.value("submission_url").trim().to_string(),
            csrf: data.value("submission_csrf"),
            errors: FormErrors::default(),
        };
        form.errors.check("title", validate_title(&form.title));
        match validate_url(&form.url) {
            Ok(url) => form.url = url,
            Err(e) => form.errors.add("url", e.to_string()),
        }
        form
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// `comment_*` fields.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CommentForm {
    pub thread_id: Option<i64>,
    pub parent_id: Option<i64>,
    pub content: String,
    pub goto: String,
    pub csrf: String,
    pub errors: FormErrors,
}

impl CommentForm {
    pub const ACTION: &'static str = "comment";

    /// Empty form for commenting on `thread_id`.
    pub fn for_thread(thread_id: i64, parent_id: Option<i64>, goto: String, csrf: String) -> Self {
        Self {
            thread_id: Some(thread_id),
            parent_id,
            goto,
            csrf,
            ..Self::default()
        }
    }

    pub fn decode(data: &FormData) -> Self {
        let mut form = Self {
            content: data.value("comment_content"),
            goto: data.value("comment_goto").trim().to_string(),
            csrf: data.value("comment_csrf"),
            ..Self::default()
        };

        form.thread_id = parse_id(&data.value("comment_thread_id"));
        if form.thread_id.is_none() {
            form.errors.add("thread_id", "a story is required");
        }

        let parent = data.value("comment_parent_id");
        let parent = parent.trim();
        if !parent.is_empty() && parent != "0" {
            form.parent_id = parse_id(parent);
            if form.parent_id.is_none() {
                form.errors.add("parent_id", "invalid parent comment");
            }
        }

        form.errors.check("content", validate_comment(&form.content));

        if form.goto.is_empty() {
            if let Some(thread_id) = form.thread_id {
                form.goto = format!("/item?id={thread_id}");
            }
        } else if !is_local_path(&form.goto) {
            form.errors.add("goto", "invalid redirect target");
        }
        form
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// `vote_*` fields.
#[derive(Debug, Clone, Default)]
pub struct VoteForm {
    pub thread_id: Option<i64>,
    pub goto: String,
    pub csrf: String,
    pub errors: FormErrors,
}

impl VoteForm {
    pub const ACTION: &'static str = "vote";

    pub fn decode(data: &FormData) -> Self {
        let mut form = Self {
            thread_id: parse_id(&data.value("vote_thread_id")),
            goto: data.value("vote_goto").trim().to_string(),
            csrf: data.value("vote_csrf"),
            errors: FormErrors::default(),
        };
        if form.thread_id.is_none() {
            form.errors.add("thread_id", "a story is required");
        }
        if form.goto.is_empty() || !is_local_path(&form.goto) {
            form.goto = "/".to_string();
        }
        form
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Logout only carries a token.
pub const LOGOUT_ACTION: &str = "logout";

#[cfg(test)]
mod tests {
    use super::*;

    fn data(pairs: &[(&str, &str)]) -> FormData {
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish();
        FormData::parse(encoded.as_bytes())
    }

    #[test]
    fn test_form_data() {
        let form = FormData::parse(b"a=1&b=hello+world&a=2&c=%3Cx%3E");
        assert_eq!(form.get("a"), Some("1"));
        assert_eq!(form.get("b"), Some("hello world"));
        assert_eq!(form.get("c"), Some("<x>"));
        assert_eq!(form.get("d"), None);
        assert_eq!(form.value("d"), "");
        assert!(FormData::parse(b"").is_empty());
    }

    #[test]
    fn test_login_form() {
        let form = LoginForm::decode(&data(&[
            ("login_username", " bill "),
            ("login_password", "secret"),
            ("login_csrf", "tok"),
        ]));
        assert!(form.is_valid());
        assert_eq!(form.username, "bill");
        assert_eq!(form.csrf, "tok");

        let empty = LoginForm::decode(&FormData::default());
        assert!(empty.errors.has("username"));
        assert!(empty.errors.has("password"));
    }

    #[test]
    fn test_login_form_hides_password() {
        let form = LoginForm::decode(&data(&[("login_password", "hunter22")]));
        let json = serde_json::to_value(&form).unwrap();
        assert!(json.get("password").is_none());
    }

    #[test]
    fn test_registration_form_valid() {
        let form = RegistrationForm::decode(&data(&[
            ("registration_username", "johnny_doe"),
            ("registration_email", "johnny_doe@acme.com"),
            ("registration_password", "password"),
            ("registration_password_confirmation", "password"),
            ("registration_csrf", "tok"),
        ]));
        assert!(form.is_valid(), "{:?}", form.errors);
    }

    #[test]
    fn test_registration_form_errors() {
        let form = RegistrationForm::decode(&data(&[
            ("registration_username", "jo"),
            ("registration_email", "bill.doe@acme"),
            ("registration_password", "password"),
            ("registration_password_confirmation", "different"),
        ]));
        assert!(form.errors.has("username"));
        assert!(form.errors.has("email"));
        assert!(!form.errors.has("password"));
        assert!(form.errors.has("password_confirmation"));

        let json = serde_json::to_value(&form).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("password_confirmation").is_none());
        assert_eq!(json["email"], "bill.doe@acme");
        assert!(json["errors"]["email"].is_array());
    }

    #[test]
    fn test_submission_form_normalizes_url() {
        let form = SubmissionForm::decode(&data(&[
            ("submission_title", "The Title"),
            ("submission_url", "foo.bar.com"),
        ]));
        assert!(form.is_valid());
        assert_eq!(form.url, "http://foo.bar.com");

        let bad = SubmissionForm::decode(&data(&[
            ("submission_title", ""),
            ("submission_url", "biz/baz"),
        ]));
        assert!(bad.errors.has("title"));
        assert!(bad.errors.has("url"));
        assert_eq!(bad.url, "biz/baz");
    }

    #[test]
    fn test_comment_form() {
        let form = CommentForm::decode(&data(&[
            ("comment_thread_id", "4"),
            ("comment_parent_id", "9"),
            ("comment_content", "Nice"),
            ("comment_goto", "/item?id=4"),
        ]));
        assert!(form.is_valid());
        assert_eq!(form.thread_id, Some(4));
        assert_eq!(form.parent_id, Some(9));

        let top_level = CommentForm::decode(&data(&[
            ("comment_thread_id", "4"),
            ("comment_parent_id", ""),
            ("comment_content", "Nice"),
        ]));
        assert!(top_level.is_valid());
        assert_eq!(top_level.parent_id, None);
        assert_eq!(top_level.goto, "/item?id=4");
    }

    #[test]
    fn test_comment_form_errors() {
        let form = CommentForm::decode(&data(&[
            ("comment_thread_id", "abc"),
            ("comment_parent_id", "x"),
            ("comment_content", "  "),
            ("comment_goto", "https://evil.example"),
        ]));
        for field in ["thread_id", "parent_id", "content", "goto"] {
            assert!(form.errors.has(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_vote_form() {
        let form = VoteForm::decode(&data(&[
            ("vote_thread_id", "3"),
            ("vote_goto", "//evil.example"),
        ]));
        assert!(form.is_valid());
        assert_eq!(form.goto, "/");

        assert!(!VoteForm::decode(&FormData::default()).is_valid());
    }
}
