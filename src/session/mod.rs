//! Session handling for linkboard.
//!
//! A [`Session`] is a bag of JSON values plus flash messages grouped by
//! category. Sessions are loaded from and saved to a [`SessionStore`];
//! the cookie that addresses them is built from [`SessionOptions`].

mod store;

use std::collections::BTreeMap;

use axum_extra::extract::cookie::Cookie;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::config::SessionConfig;

pub use store::{CookieStore, MemoryStore, SessionStore};

/// Session key holding the logged-in user ID.
pub const USER_ID_KEY: &str = "user.ID";

/// Session key holding the CSRF subject.
pub const CSRF_ID_KEY: &str = "csrf.ID";

/// Session lifetime when none is configured (one day).
pub const DEFAULT_MAX_AGE_SECS: i64 = 86400;

/// Flash category for errors.
pub const FLASH_ERRORS: &str = "errors";

/// Flash category for confirmations.
pub const FLASH_SUCCESS: &str = "success";

/// Session errors.
#[derive(Error, Debug)]
pub enum SessionError {
    /// Session data could not be encoded.
    #[error("session serialization failed: {0}")]
    Serialization(String),

    /// The store's lock was poisoned by a panicking request.
    #[error("session store is poisoned")]
    StorePoisoned,

    /// The store could not be keyed.
    #[error("invalid session key: {0}")]
    InvalidKey(String),
}

/// Persisted part of a session.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct SessionData {
    #[serde(default)]
    pub values: BTreeMap<String, Value>,
    #[serde(default)]
    pub flashes: BTreeMap<String, Vec<String>>,
}

/// A user-agent session.
#[derive(Debug, Clone)]
pub struct Session {
    name: String,
    id: Option<String>,
    data: SessionData,
    modified: bool,
}

impl Session {
    /// Create an empty session for the cookie `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: None,
            data: SessionData::default(),
            modified: false,
        }
    }

    pub(crate) fn from_data(name: &str, id: Option<String>, data: SessionData) -> Self {
        Self {
            name: name.to_string(),
            id,
            data,
            modified: false,
        }
    }

    pub(crate) fn data(&self) -> &SessionData {
        &self.data
    }

    pub(crate) fn set_id(&mut self, id: String) {
        self.id = Some(id);
    }

    /// Cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store-side identifier, if the store assigned one.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Whether the session changed since it was loaded.
    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.values.get(key)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(Value::as_i64)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.values.insert(key.into(), value.into());
        self.modified = true;
    }

    pub fn has(&self, key: &str) -> bool {
        self.data.values.contains_key(key)
    }

    /// Remove a key, returning its value.
    pub fn delete(&mut self, key: &str) -> Option<Value> {
        let removed = self.data.values.remove(key);
        if removed.is_some() {
            self.modified = true;
        }
        removed
    }

    /// All stored values.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.data.values
    }

    /// Queue a flash message shown on the next rendered page.
    pub fn add_flash(&mut self, message: impl Into<String>, category: &str) {
        self.data
            .flashes
            .entry(category.to_string())
            .or_default()
            .push(message.into());
        self.modified = true;
    }

    /// Consume the flash messages of one category.
    pub fn flashes(&mut self, category: &str) -> Vec<String> {
        match self.data.flashes.remove(category) {
            Some(messages) => {
                self.modified = true;
                messages
            }
            None => Vec::new(),
        }
    }

    /// Pending flash messages, grouped by category, without consuming them.
    pub fn peek_flashes(&self) -> &BTreeMap<String, Vec<String>> {
        &self.data.flashes
    }

    /// Consume every flash message, grouped by category.
    pub fn take_flashes(&mut self) -> BTreeMap<String, Vec<String>> {
        if self.data.flashes.is_empty() {
            return BTreeMap::new();
        }
        self.modified = true;
        std::mem::take(&mut self.data.flashes)
    }
}

/// Attributes of the session cookie.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub path: String,
    pub domain: Option<String>,
    pub max_age_secs: i64,
    pub http_only: bool,
    pub secure: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            path: "/".to_string(),
            domain: None,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
            http_only: true,
            secure: false,
        }
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            path: config.path.clone(),
            domain: config.domain.clone().filter(|d| !d.is_empty()),
            max_age_secs: config.max_age_secs,
            http_only: config.http_only,
            secure: config.secure,
        }
    }
}

impl SessionOptions {
    /// Build the `Set-Cookie` cookie for a saved session.
    pub fn cookie(&self, name: &str, value: String) -> Cookie<'static> {
        let mut builder = Cookie::build((name.to_string(), value))
            .path(self.path.clone())
            .http_only(self.http_only)
            .secure(self.secure)
            .max_age(time::Duration::seconds(self.max_age_secs));
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        builder.build()
    }
}
