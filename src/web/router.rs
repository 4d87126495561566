//! Route table.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use super::container::{AppState, Container};
use super::controllers::{self, account, comments, stories, submission};
use super::middleware::security_headers;

/// Wrap a controller into an axum handler.
///
/// The handler builds the request container, resolves the current user,
/// runs the controller inside the request span and converts its outcome
/// into the response.
macro_rules! controller {
    ($handler:path) => {
        |State(state): State<Arc<AppState>>, request: Request| async move {
            let mut c = match Container::from_request(state, request).await {
                Ok(c) => c,
                Err(failure) => return (failure.status(), failure.to_string()).into_response(),
            };
            let span = c.logger().clone();
            async move {
                let outcome = match c.load_current_user().await {
                    Ok(()) => $handler(&mut c).await,
                    Err(failure) => Err(failure),
                };
                c.finish(outcome)
            }
            .instrument(span)
            .await
        }
    };
}

/// Build the application router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(controller!(stories::by_score)))
        .route("/newest", get(controller!(stories::newest)))
        .route("/domain", get(controller!(stories::by_domain)))
        .route("/submitted", get(controller!(stories::by_author)))
        .route("/threads", get(controller!(comments::by_author)))
        .route("/newcomments", get(controller!(comments::newest)))
        .route("/user", get(controller!(account::profile)))
        .route(
            "/item",
            get(controller!(stories::show)).post(controller!(submission::reply)),
        )
        .route(
            "/thread",
            get(controller!(stories::show)).post(controller!(submission::reply)),
        )
        .route(
            "/login",
            get(controller!(account::login_page)).post(controller!(account::login)),
        )
        .route(
            "/register",
            get(controller!(account::login_page)).post(controller!(account::register)),
        )
        .route("/logout", post(controller!(account::logout)))
        .route(
            "/submit",
            get(controller!(submission::submit_page)).post(controller!(submission::submit)),
        )
        .route(
            "/comment",
            get(controller!(submission::reply_page)).post(controller!(submission::reply)),
        )
        .route("/vote", post(controller!(stories::vote)))
        .fallback(controller!(controllers::not_found))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(security_headers)),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Config, Database};
    use axum::body::Body;
    use axum::http::{Request as HttpRequest, StatusCode};
    use tower::util::ServiceExt;

    async fn test_router(dir: &std::path::Path) -> Router {
        std::fs::write(
            dir.join("error.tpl.html"),
            "<p class=\"error\">{{status}} {{status_text}}</p>",
        )
        .unwrap();
        std::fs::write(dir.join("login.tpl.html"), "<form name=\"login\"></form>").unwrap();

        let mut config = Config::default();
        config.security.secret = "router-test-secret".to_string();
        config.templates.path = dir.display().to_string();
        let db = Database::open_in_memory().await.unwrap();
        create_router(Arc::new(AppState::new(db, config).unwrap()))
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path()).await;

        let response = app
            .oneshot(HttpRequest::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers().get("X-Content-Type-Options").unwrap(),
            "nosniff"
        );
    }

    #[tokio::test]
    async fn test_login_page_sets_session_cookie() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path()).await;

        let response = app
            .oneshot(HttpRequest::builder().uri("/login").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("set-cookie").is_some());
    }

    #[tokio::test]
    async fn test_wrong_method_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = test_router(dir.path()).await;

        let response = app
            .oneshot(
                HttpRequest::builder()
                    .method("POST")
                    .uri("/newest")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }
}
