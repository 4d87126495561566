//! Request-scoped service container.
//!
//! [`AppState`] holds what every request shares. A [`Container`] is built
//! per request on top of it and lazily creates the per-request services:
//! repositories, the session, CSRF tokens and the template engine.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::Request;
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::Span;

use crate::auth::CsrfGenerator;
use crate::config::Config;
use crate::db::{User, UserRepository};
use crate::forum::{CommentRepository, ThreadRepository};
use crate::session::{
    CookieStore, MemoryStore, Session, SessionOptions, SessionStore, CSRF_ID_KEY, USER_ID_KEY,
};
use crate::template::{TemplateContext, TemplateEngine, TemplateError, TemplateLoader, Value};
use crate::Database;

use super::error::{Failure, Fatal, Outcome};
use super::forms::{FormData, VoteForm, LOGOUT_ACTION};
use super::response::ResponseWriter;

/// Largest accepted request body.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Template rendered by [`Container::http_error`].
pub const ERROR_TEMPLATE: &str = "error";

/// State shared by all requests.
pub struct AppState {
    pub db: Database,
    pub config: Config,
    pub session_store: Arc<dyn SessionStore>,
    pub session_options: SessionOptions,
    pub templates: Arc<TemplateEngine>,
    pub csrf: CsrfGenerator,
}

impl AppState {
    /// Build the shared state: session store, preloaded templates, CSRF keys.
    pub fn new(db: Database, config: Config) -> crate::Result<Self> {
        let session_store: Arc<dyn SessionStore> = match config.session.store.as_str() {
            "memory" => Arc::new(MemoryStore::new(config.session.max_age_secs)),
            _ => Arc::new(CookieStore::new(
                &config.security.secret,
                config.session.max_age_secs,
            )?),
        };
        let templates = Arc::new(load_templates(&config)?);
        let csrf = CsrfGenerator::new(
            &config.security.secret,
            Duration::from_secs(config.security.csrf_ttl_secs),
        )?;

        tracing::info!(
            templates = templates.len(),
            session_store = %config.session.store,
            "Application state ready"
        );

        Ok(Self {
            db,
            session_options: SessionOptions::from(&config.session),
            config,
            session_store,
            templates,
            csrf,
        })
    }

    /// Rows per listing page.
    pub fn stories_per_page(&self) -> i64 {
        i64::from(self.config.site.stories_per_page)
    }
}

fn load_templates(config: &Config) -> Result<TemplateEngine, TemplateError> {
    TemplateLoader::with_extension(&config.templates.path, config.templates.extension.clone())
        .load_all()
}

/// Per-request registry of services.
pub struct Container {
    state: Arc<AppState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
    span: Span,
    threads: OnceLock<ThreadRepository>,
    users: OnceLock<UserRepository>,
    comments: OnceLock<CommentRepository>,
    reloaded_templates: Option<Arc<TemplateEngine>>,
    current_user: Option<User>,
    response: ResponseWriter,
}

impl Container {
    /// Build a container from an incoming request, collecting its body.
    pub async fn from_request(state: Arc<AppState>, request: Request) -> Result<Self, Failure> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, MAX_BODY_BYTES)
            .await
            .map_err(|e| Failure::http(StatusCode::PAYLOAD_TOO_LARGE, e.to_string()))?;
        Ok(Self::new(state, parts.method, parts.uri, parts.headers, body))
    }

    pub fn new(
        state: Arc<AppState>,
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        body: Bytes,
    ) -> Self {
        let span = tracing::info_span!("request", method = %method, path = %uri.path());
        let response = ResponseWriter::new(
            Arc::clone(&state.session_store),
            state.session_options.clone(),
        );
        Self {
            state,
            method,
            uri,
            headers,
            body,
            span,
            threads: OnceLock::new(),
            users: OnceLock::new(),
            comments: OnceLock::new(),
            reloaded_templates: None,
            current_user: None,
            response,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    pub fn debug(&self) -> bool {
        self.state.config.site.debug
    }

    pub fn db(&self) -> &SqlitePool {
        self.state.db.pool()
    }

    /// Span all events of this request are recorded under.
    pub fn logger(&self) -> &Span {
        &self.span
    }

    pub fn threads(&self) -> &ThreadRepository {
        self.threads
            .get_or_init(|| ThreadRepository::new(self.state.db.pool().clone()))
    }

    pub fn users(&self) -> &UserRepository {
        self.users
            .get_or_init(|| UserRepository::new(self.state.db.pool().clone()))
    }

    pub fn comments(&self) -> &CommentRepository {
        self.comments
            .get_or_init(|| CommentRepository::new(self.state.db.pool().clone()))
    }

    /// Template engine; reloaded from disk once per request in debug mode.
    pub fn templates(&mut self) -> Result<Arc<TemplateEngine>, Fatal> {
        if !self.debug() {
            return Ok(Arc::clone(&self.state.templates));
        }
        if let Some(engine) = &self.reloaded_templates {
            return Ok(Arc::clone(engine));
        }
        let engine = Arc::new(
            load_templates(&self.state.config)
                .map_err(|e| Fatal::new(format!("cannot load templates: {e}")))?,
        );
        self.reloaded_templates = Some(Arc::clone(&engine));
        Ok(engine)
    }

    /// The session, loaded from the store on first use.
    pub fn session(&mut self) -> Result<&mut Session, Fatal> {
        if self.response.session().is_none() {
            let session = self
                .state
                .session_store
                .load(&self.headers, &self.state.config.session.name)?;
            self.response.attach_session(session);
        }
        self.response
            .session_mut()
            .ok_or_else(|| Fatal::new("session could not be attached"))
    }

    pub fn csrf_generator(&self) -> &CsrfGenerator {
        &self.state.csrf
    }

    fn csrf_subject(&mut self) -> Result<String, Fatal> {
        let session = self.session()?;
        if let Some(id) = session.get_str(CSRF_ID_KEY) {
            return Ok(id.to_string());
        }
        let id = uuid::Uuid::new_v4().to_string();
        session.set(CSRF_ID_KEY, id.clone());
        Ok(id)
    }

    /// Token for a form posting to `action`.
    pub fn csrf_token(&mut self, action: &str) -> Result<String, Fatal> {
        let subject = self.csrf_subject()?;
        Ok(self.state.csrf.generate(&subject, action))
    }

    /// Check a submitted token. A session without a CSRF subject never validates.
    pub fn csrf_valid(&mut self, token: &str, action: &str) -> Result<bool, Fatal> {
        let subject = self.session()?.get_str(CSRF_ID_KEY).map(str::to_string);
        Ok(subject.is_some_and(|subject| self.state.csrf.valid(token, &subject, action)))
    }

    pub fn current_user(&self) -> Option<&User> {
        self.current_user.as_ref()
    }

    /// Resolve `user.ID` from the session. A dangling id is removed.
    pub async fn load_current_user(&mut self) -> Outcome {
        let Some(user_id) = self.session()?.get_i64(USER_ID_KEY) else {
            return Ok(());
        };
        match self.users().get_by_id(user_id).await? {
            Some(user) => self.current_user = Some(user),
            None => {
                tracing::debug!(user_id, "Dropping unknown user from session");
                self.session()?.delete(USER_ID_KEY);
            }
        }
        Ok(())
    }

    /// Remember `user` as logged in.
    pub fn sign_in(&mut self, user: User) -> Result<(), Fatal> {
        self.session()?.set(USER_ID_KEY, user.id);
        self.current_user = Some(user);
        Ok(())
    }

    pub fn sign_out(&mut self) -> Result<(), Fatal> {
        self.session()?.delete(USER_ID_KEY);
        self.current_user = None;
        Ok(())
    }

    /// Method, URI and headers of the request.
    pub fn request(&self) -> (&Method, &Uri, &HeaderMap) {
        (&self.method, &self.uri, &self.headers)
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Decoded query string.
    pub fn query(&self) -> FormData {
        FormData::parse(self.uri.query().unwrap_or_default().as_bytes())
    }

    /// Decoded urlencoded body.
    pub fn form(&self) -> FormData {
        FormData::parse(&self.body)
    }

    pub fn response(&self) -> &ResponseWriter {
        &self.response
    }

    pub fn response_mut(&mut self) -> &mut ResponseWriter {
        &mut self.response
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.response.set_status(status);
    }

    /// Render `name` with `data` plus the site-wide globals and write it out.
    ///
    /// Flash messages are consumed only once the page rendered.
    pub fn render<T: Serialize + ?Sized>(&mut self, name: &str, data: &T) -> Outcome {
        let engine = self.templates()?;
        let mut context = TemplateContext::from_serialize(data)?;
        self.add_globals(&mut context)?;
        let html = engine.render(name, &context)?;
        self.session()?.take_flashes();

        self.response.insert_header(
            CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        self.response.write(html.as_bytes());
        Ok(())
    }

    fn add_globals(&mut self, context: &mut TemplateContext) -> Result<(), Failure> {
        let site = &self.state.config.site;
        context.set(
            "site",
            Value::from(serde_json::json!({
                "title": site.title,
                "slogan": site.slogan,
                "description": site.description,
            })),
        );
        context.set("debug", Value::Bool(site.debug));
        context.set("current_user", Value::from_serialize(&self.current_user)?);

        if self.current_user.is_some() {
            let logout = self.csrf_token(LOGOUT_ACTION)?;
            let vote = self.csrf_token(VoteForm::ACTION)?;
            context.set(
                "csrf",
                Value::from(serde_json::json!({ "logout": logout, "vote": vote })),
            );
        }

        let flashes = Value::from_serialize(self.session()?.peek_flashes())?;
        context.set("flashes", flashes);
        Ok(())
    }

    /// Persist the session, then point the client at `location`.
    pub fn redirect(&mut self, location: &str, status: StatusCode) -> Outcome {
        self.response.flush_session();
        let value = HeaderValue::from_str(location)
            .map_err(|_| Failure::internal(format!("invalid redirect location {location:?}")))?;
        self.response.set_status(status);
        self.response.insert_header(LOCATION, value);
        Ok(())
    }

    /// Answer 401 with a pointer to the login page.
    pub fn redirect_to_login(&mut self) -> Outcome {
        self.redirect("/login", StatusCode::UNAUTHORIZED)
    }

    /// Answer `status` with the error page, or a plain line if the body is
    /// already started or the page cannot be rendered.
    pub fn http_error(&mut self, status: StatusCode, message: &str) {
        if status.is_server_error() {
            tracing::error!(status = status.as_u16(), reason = %message, "Request failed");
        } else {
            tracing::warn!(status = status.as_u16(), reason = %message, "Request rejected");
        }

        self.response.set_status(status);
        let status_text = status.canonical_reason().unwrap_or("Error");
        let shown = if self.debug() { message } else { status_text };

        if !self.response.is_written() {
            let data = serde_json::json!({
                "title": status_text,
                "status": status.as_u16(),
                "status_text": status_text,
                "message": shown,
            });
            match self.render(ERROR_TEMPLATE, &data) {
                Ok(()) => return,
                Err(failure) => tracing::error!(error = %failure, "Cannot render error page"),
            }
            self.response.insert_header(
                CONTENT_TYPE,
                HeaderValue::from_static("text/plain; charset=utf-8"),
            );
        }

        let line = format!("{} {}\n", status.as_u16(), shown);
        self.response.write(line.as_bytes());
    }

    /// Translate the controller outcome and produce the response.
    pub fn finish(mut self, outcome: Outcome) -> Response {
        match outcome {
            Ok(()) => {}
            Err(Failure::Http { status, message }) => self.http_error(status, &message),
            Err(Failure::Fatal(fatal)) => {
                tracing::error!(error = %fatal, "Aborting request");
                self.response.reset_to_internal_error();
            }
        }
        self.response.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::header::{COOKIE, SET_COOKIE};
    use std::path::Path;

    const SECRET: &str = "container-test-secret";

    async fn state_with(templates: &Path, debug: bool) -> Arc<AppState> {
        let db = Database::open_in_memory().await.unwrap();
        let mut config = Config::default();
        config.security.secret = SECRET.to_string();
        config.templates.path = templates.display().to_string();
        config.site.debug = debug;
        Arc::new(AppState::new(db, config).unwrap())
    }

    fn write_broken_error_template(dir: &Path) {
        std::fs::write(dir.join("error.tpl.html"), "{{> partials/missing}}").unwrap();
        std::fs::write(dir.join("page.tpl.html"), "{{> partials/missing}}").unwrap();
    }

    fn write_templates(dir: &Path) {
        std::fs::write(
            dir.join("error.tpl.html"),
            "<h1>{{status}} {{status_text}}</h1><p class=\"error-message\">{{message}}</p>",
        )
        .unwrap();
        std::fs::write(
            dir.join("page.tpl.html"),
            "{{site.title}}|{{name}}|{{#each flashes.success}}{{this}}{{/each}}",
        )
        .unwrap();
    }

    fn container(state: Arc<AppState>, headers: HeaderMap) -> Container {
        Container::new(
            state,
            Method::GET,
            Uri::from_static("/page?p=2&Site=example.com"),
            headers,
            Bytes::from_static(b"login_username=bill&login_csrf=x"),
        )
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_query_and_form() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let c = container(state_with(dir.path(), false).await, HeaderMap::new());

        assert_eq!(c.query().get("p"), Some("2"));
        assert_eq!(c.query().get("Site"), Some("example.com"));
        assert_eq!(c.form().get("login_username"), Some("bill"));
        assert_eq!(c.method(), Method::GET);
        assert_eq!(c.uri().path(), "/page");

        let (method, uri, headers) = c.request();
        assert_eq!(method, Method::GET);
        assert_eq!(uri.query(), Some("p=2&Site=example.com"));
        assert!(headers.is_empty());
    }

    #[tokio::test]
    async fn test_repositories_are_cached() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let c = container(state_with(dir.path(), false).await, HeaderMap::new());

        assert!(std::ptr::eq(c.threads(), c.threads()));
        assert!(std::ptr::eq(c.users(), c.users()));
        assert!(std::ptr::eq(c.comments(), c.comments()));
    }

    #[tokio::test]
    async fn test_csrf_round_trip_across_requests() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let state = state_with(dir.path(), false).await;

        let mut first = container(Arc::clone(&state), HeaderMap::new());
        let token = first.csrf_token("login").unwrap();
        assert!(first.csrf_valid(&token, "login").unwrap());
        assert!(!first.csrf_valid(&token, "registration").unwrap());
        let response = first.finish(Ok(()));
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        let pair = cookie.split(';').next().unwrap().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
        let mut second = container(Arc::clone(&state), headers);
        assert!(second.csrf_valid(&token, "login").unwrap());

        let mut stranger = container(state, HeaderMap::new());
        assert!(!stranger.csrf_valid(&token, "login").unwrap());
    }

    #[tokio::test]
    async fn test_render_adds_globals_and_consumes_flashes() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let mut c = container(state_with(dir.path(), false).await, HeaderMap::new());
        c.session().unwrap().add_flash("Saved", "success");

        c.render("page", &serde_json::json!({"name": "<bill>"})).unwrap();

        assert!(c.session().unwrap().take_flashes().is_empty());
        let response = c.finish(Ok(()));
        assert_eq!(
            response.headers().get(CONTENT_TYPE).unwrap(),
            "text/html; charset=utf-8"
        );
        assert_eq!(body_text(response).await, "linkboard|&lt;bill&gt;|Saved");
    }

    #[tokio::test]
    async fn test_http_error_renders_error_page() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let c = container(state_with(dir.path(), false).await, HeaderMap::new());

        let response = c.finish(Err(Failure::not_found("Thread with ID 7 not found")));
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = body_text(response).await;
        assert!(body.contains("404 Not Found"));
        assert!(!body.contains("Thread with ID 7"));
    }

    #[tokio::test]
    async fn test_http_error_debug_shows_message() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let c = container(state_with(dir.path(), true).await, HeaderMap::new());

        let response = c.finish(Err(Failure::internal("database is locked")));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_text(response).await.contains("database is locked"));
    }

    #[tokio::test]
    async fn test_http_error_after_write_appends() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let mut c = container(state_with(dir.path(), false).await, HeaderMap::new());
        c.response_mut().write(b"partial");

        let response = c.finish(Err(Failure::internal("boom")));
        assert_eq!(
            body_text(response).await,
            "partial500 Internal Server Error\n"
        );
    }

    #[tokio::test]
    async fn test_fatal_resets_response() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let mut c = container(state_with(dir.path(), false).await, HeaderMap::new());
        c.render("page", &serde_json::json!({})).unwrap();

        let response = c.finish(Err(Fatal::new("store poisoned").into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_text(response).await, "500 Internal Server Error\n");
    }

    #[tokio::test]
    async fn test_redirect_saves_session_first() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let mut c = container(state_with(dir.path(), false).await, HeaderMap::new());
        c.session().unwrap().add_flash("Welcome", "success");

        c.redirect("/login", StatusCode::FOUND).unwrap();
        assert!(c.response().is_session_flushed());

        let response = c.finish(Ok(()));
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");
        assert!(response.headers().get(SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn test_dangling_user_removed_from_session() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let mut c = container(state_with(dir.path(), false).await, HeaderMap::new());
        c.session().unwrap().set(USER_ID_KEY, 99);

        c.load_current_user().await.unwrap();

        assert!(c.current_user().is_none());
        assert!(!c.session().unwrap().has(USER_ID_KEY));
    }

    #[tokio::test]
    async fn test_debug_templates_reload_once_per_request() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let mut c = container(state_with(dir.path(), true).await, HeaderMap::new());

        let first = c.templates().unwrap();
        let second = c.templates().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &c.state().templates));
    }

    #[tokio::test]
    async fn test_missing_template_dir_is_fatal_in_debug() {
        let dir = tempfile::tempdir().unwrap();
        write_templates(dir.path());
        let state = state_with(dir.path(), true).await;
        drop(dir);

        let mut c = container(state, HeaderMap::new());
        assert!(c.templates().is_err());
    }

    #[tokio::test]
    async fn test_failed_render_keeps_flashes() {
        let dir = tempfile::tempdir().unwrap();
        write_broken_error_template(dir.path());
        let mut c = container(state_with(dir.path(), false).await, HeaderMap::new());
        c.session().unwrap().add_flash("Saved", "success");

        assert!(c.render("page", &serde_json::json!({})).is_err());

        assert_eq!(c.session().unwrap().flashes("success"), vec!["Saved"]);
    }

    #[tokio::test]
    async fn test_plain_error_fallback_keeps_flashes() {
        let dir = tempfile::tempdir().unwrap();
        write_broken_error_template(dir.path());
        let state = state_with(dir.path(), false).await;
        let mut c = container(Arc::clone(&state), HeaderMap::new());
        c.session().unwrap().add_flash("Saved", "success");

        c.http_error(StatusCode::NOT_FOUND, "gone");
        assert_eq!(c.response().body(), b"404 Not Found\n");
        let response = c.finish(Ok(()));
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap();
        let pair = cookie.split(';').next().unwrap().to_string();

        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_str(&pair).unwrap());
        let mut next = container(state, headers);
        assert_eq!(next.session().unwrap().flashes("success"), vec!["Saved"]);
    }
}
