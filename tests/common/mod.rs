//! Test helpers for HTTP integration tests.
//!
//! Provides an in-process server over an in-memory database, fixtures for
//! users, stories and comments, and helpers to drive the HTML forms.

#![allow(dead_code)]

use std::sync::Arc;

use axum_test::{TestResponse, TestServer};

use linkboard::{
    create_router, AppState, Comment, CommentRepository, Config, Database, NewComment, NewThread,
    NewUser, Thread, ThreadRepository, User, UserRepository,
};

/// Password used for every fixture user.
pub const PASSWORD: &str = "correct horse";

/// A running application with direct database access.
pub struct TestApp {
    pub server: TestServer,
    pub db: Database,
}

impl TestApp {
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.db.pool().clone())
    }

    pub fn threads(&self) -> ThreadRepository {
        ThreadRepository::new(self.db.pool().clone())
    }

    pub fn comments(&self) -> CommentRepository {
        CommentRepository::new(self.db.pool().clone())
    }

    pub async fn create_user(&self, username: &str) -> User {
        let email = format!("{username}@example.com");
        let new_user = NewUser::with_plain_password(username, email, PASSWORD).unwrap();
        self.users().create(&new_user).await.unwrap()
    }

    pub async fn create_thread(&self, title: &str, url: &str, author: &User) -> Thread {
        self.threads()
            .create(&NewThread::new(title, url, author.id))
            .await
            .unwrap()
    }

    pub async fn create_comment(
        &self,
        thread: &Thread,
        parent: Option<&Comment>,
        author: &User,
        content: &str,
    ) -> Comment {
        let mut new_comment = NewComment::new(thread.id, author.id, content);
        if let Some(parent) = parent {
            new_comment = new_comment.with_parent(parent.id);
        }
        self.comments().create(&new_comment).await.unwrap()
    }

    /// Log in through the login form.
    pub async fn login(&self, username: &str, password: &str) -> TestResponse {
        let page = self.server.get("/login").await;
        let csrf = input_value(&page.text(), "login_csrf");
        self.server
            .post("/login")
            .form(&[
                ("login_username", username),
                ("login_password", password),
                ("login_csrf", csrf.as_str()),
            ])
            .await
    }
}

/// Configuration pointing at the bundled templates.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.security.secret = "integration-test-secret".to_string();
    config.templates.path = concat!(env!("CARGO_MANIFEST_DIR"), "/templates").to_string();
    config
}

pub async fn test_app() -> TestApp {
    test_app_with(|_| {}).await
}

pub async fn test_app_with(configure: impl FnOnce(&mut Config)) -> TestApp {
    let mut config = test_config();
    configure(&mut config);

    let db = Database::open_in_memory()
        .await
        .expect("Failed to create test database");
    let state = AppState::new(db.clone(), config).expect("Failed to build app state");
    let server = TestServer::builder()
        .save_cookies()
        .mock_transport()
        .build(create_router(Arc::new(state)))
        .expect("Failed to create test server");

    TestApp { server, db }
}

/// Value attribute of the input named `name`.
pub fn input_value(html: &str, name: &str) -> String {
    let marker = format!("name=\"{name}\" value=\"");
    let start = html
        .find(&marker)
        .unwrap_or_else(|| panic!("no input named {name} in page:\n{html}"))
        + marker.len();
    let end = start + html[start..].find('"').unwrap();
    html[start..end].to_string()
}

/// Number of story rows in a page.
pub fn thread_count(html: &str) -> usize {
    html.matches("class=\"thread\"").count()
}
