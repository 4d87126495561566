//! Session stores.
//!
//! Both stores enforce the session max-age on the server: a cookie store
//! session carries its signed issue time, a memory store entry its expiry.
//! Times are Unix seconds.

use std::collections::HashMap;
use std::sync::Mutex;

use axum::http::HeaderMap;
use axum_extra::extract::cookie::CookieJar;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use super::{Session, SessionData, SessionError, DEFAULT_MAX_AGE_SECS};

type HmacSha256 = Hmac<Sha256>;

/// Backend that loads and persists sessions.
pub trait SessionStore: Send + Sync {
    /// Load the session addressed by the cookie `name`.
    ///
    /// A missing, malformed, forged or expired cookie yields a fresh session.
    fn load(&self, headers: &HeaderMap, name: &str) -> Result<Session, SessionError>;

    /// Persist the session and return the cookie value addressing it.
    fn save(&self, session: &mut Session) -> Result<String, SessionError>;
}

fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(name)
        .map(|cookie| cookie.value().to_string())
}

fn now_secs() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Signed content of a session cookie.
#[derive(Serialize, Deserialize)]
struct CookiePayload {
    issued_at: i64,
    data: SessionData,
}

/// Keeps the whole session in a signed cookie.
///
/// Cookie value: `base64url(json) "." base64url(hmac)`, where the JSON holds
/// the session data and its issue time.
#[derive(Clone)]
pub struct CookieStore {
    mac: HmacSha256,
    max_age_secs: i64,
}

impl CookieStore {
    pub fn new(secret: &str, max_age_secs: i64) -> Result<Self, SessionError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| SessionError::InvalidKey(e.to_string()))?;
        Ok(Self { mac, max_age_secs })
    }

    fn encode(&self, data: &SessionData, now: i64) -> Result<String, SessionError> {
        let payload = CookiePayload {
            issued_at: now,
            data: data.clone(),
        };
        let json = serde_json::to_vec(&payload)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;
        let payload = URL_SAFE_NO_PAD.encode(json);
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        Ok(format!("{payload}.{signature}"))
    }

    fn decode(&self, value: &str, now: i64) -> Option<SessionData> {
        let (payload, signature) = value.split_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;
        let mut mac = self.mac.clone();
        mac.update(payload.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let json = URL_SAFE_NO_PAD.decode(payload).ok()?;
        let payload: CookiePayload = serde_json::from_slice(&json).ok()?;
        if now.saturating_sub(payload.issued_at) > self.max_age_secs {
            return None;
        }
        Some(payload.data)
    }

    pub(crate) fn load_at(&self, headers: &HeaderMap, name: &str, now: i64) -> Session {
        let data = cookie_value(headers, name).and_then(|value| {
            let decoded = self.decode(&value, now);
            if decoded.is_none() {
                tracing::debug!(cookie = name, "Discarding invalid or expired session cookie");
            }
            decoded
        });
        Session::from_data(name, None, data.unwrap_or_default())
    }

    pub(crate) fn save_at(&self, session: &Session, now: i64) -> Result<String, SessionError> {
        self.encode(session.data(), now)
    }
}

impl SessionStore for CookieStore {
    fn load(&self, headers: &HeaderMap, name: &str) -> Result<Session, SessionError> {
        Ok(self.load_at(headers, name, now_secs()))
    }

    fn save(&self, session: &mut Session) -> Result<String, SessionError> {
        self.save_at(session, now_secs())
    }
}

impl std::fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieStore")
            .field("max_age_secs", &self.max_age_secs)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
struct StoredSession {
    data: SessionData,
    expires_at: i64,
}

impl StoredSession {
    fn is_expired(&self, now: i64) -> bool {
        now >= self.expires_at
    }
}

/// Keeps sessions in process memory; the cookie only carries a random id.
///
/// Each save extends the entry's lifetime by the max-age and drops every
/// expired entry.
#[derive(Debug)]
pub struct MemoryStore {
    sessions: Mutex<HashMap<String, StoredSession>>,
    max_age_secs: i64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_AGE_SECS)
    }
}

impl MemoryStore {
    pub fn new(max_age_secs: i64) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_age_secs,
        }
    }

    /// Number of stored sessions, expired ones included until the next save.
    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn load_at(
        &self,
        headers: &HeaderMap,
        name: &str,
        now: i64,
    ) -> Result<Session, SessionError> {
        let Some(id) = cookie_value(headers, name) else {
            return Ok(Session::new(name));
        };
        let sessions = self
            .sessions
            .lock()
            .map_err(|_| SessionError::StorePoisoned)?;
        Ok(match sessions.get(&id) {
            Some(stored) if !stored.is_expired(now) => {
                Session::from_data(name, Some(id), stored.data.clone())
            }
            _ => Session::new(name),
        })
    }

    pub(crate) fn save_at(&self, session: &mut Session, now: i64) -> Result<String, SessionError> {
        let id = match session.id() {
            Some(id) => id.to_string(),
            None => {
                let id = uuid::Uuid::new_v4().to_string();
                session.set_id(id.clone());
                id
            }
        };
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|_| SessionError::StorePoisoned)?;
        sessions.retain(|_, stored| !stored.is_expired(now));
        sessions.insert(
            id.clone(),
            StoredSession {
                data: session.data().clone(),
                expires_at: now.saturating_add(self.max_age_secs),
            },
        );
        Ok(id)
    }
}

impl SessionStore for MemoryStore {
    fn load(&self, headers: &HeaderMap, name: &str) -> Result<Session, SessionError> {
        self.load_at(headers, name, now_secs())
    }

    fn save(&self, session: &mut Session) -> Result<String, SessionError> {
        self.save_at(session, now_secs())
    }
}
