//! linkboard - a link-discussion forum
//!
//! Members submit links, discuss them in threaded comments and vote on them.
//! Pages are rendered on the server from templates; every request runs
//! against a request-scoped service container.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod forum;
pub mod logging;
pub mod session;
pub mod template;
pub mod web;

pub use config::Config;
pub use db::{Database, NewUser, User, UserRepository};
pub use error::{ForumError, Result};
pub use forum::{Comment, CommentRepository, NewComment, NewThread, Thread, ThreadRepository};
pub use web::{create_router, AppState, WebServer};
