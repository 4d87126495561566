//! Buffered response with save-once session semantics.

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use axum::response::Response;

use crate::session::{Session, SessionOptions, SessionStore};

/// Collects status, headers and body of a response.
///
/// The attached session is written back at most once: at the first body
/// write, at an explicit [`flush_session`](Self::flush_session) or when the
/// response is finished, whichever comes first. Later session changes are
/// not persisted.
pub struct ResponseWriter {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    written: bool,
    session: Option<Session>,
    session_flushed: bool,
    store: Arc<dyn SessionStore>,
    options: SessionOptions,
}

impl ResponseWriter {
    pub fn new(store: Arc<dyn SessionStore>, options: SessionOptions) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            written: false,
            session: None,
            session_flushed: false,
            store,
            options,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn insert_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Whether body bytes were written.
    pub fn is_written(&self) -> bool {
        self.written
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Append to the body, persisting the session first if still pending.
    pub fn write(&mut self, bytes: &[u8]) {
        self.flush_session();
        self.written = true;
        self.body.extend_from_slice(bytes);
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.session.as_mut()
    }

    pub fn attach_session(&mut self, session: Session) {
        self.session = Some(session);
    }

    /// Whether the session was already written back.
    pub fn is_session_flushed(&self) -> bool {
        self.session_flushed
    }

    /// Persist the session if it is loaded and modified; only the first call acts.
    pub fn flush_session(&mut self) {
        if std::mem::replace(&mut self.session_flushed, true) {
            return;
        }
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if !session.is_modified() {
            return;
        }

        let name = session.name().to_string();
        match self.store.save(session) {
            Ok(value) => {
                let cookie = self.options.cookie(&name, value);
                match HeaderValue::from_str(&cookie.to_string()) {
                    Ok(header) => {
                        self.headers.append(SET_COOKIE, header);
                    }
                    Err(e) => tracing::error!(error = %e, "Session cookie is not a valid header"),
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to save session"),
        }
    }

    /// Drop everything buffered and answer a bare 500.
    ///
    /// The session is not saved afterwards.
    pub fn reset_to_internal_error(&mut self) {
        self.session_flushed = true;
        self.status = StatusCode::INTERNAL_SERVER_ERROR;
        self.headers.clear();
        self.headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.body.clear();
        self.body.extend_from_slice(b"500 Internal Server Error\n");
        self.written = true;
    }

    /// Build the final response.
    pub fn finish(mut self) -> Response {
        self.flush_session();

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}
