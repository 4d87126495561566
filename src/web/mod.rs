//! HTML front end.
//!
//! Every route runs a controller against a request-scoped [`Container`];
//! the router converts the controller's [`Outcome`] into the response.

pub mod container;
pub mod controllers;
pub mod error;
pub mod forms;
pub mod middleware;
pub mod pagination;
pub mod response;
pub mod router;
pub mod server;

pub use container::{AppState, Container};
pub use error::{Failure, Fatal, Outcome};
pub use router::create_router;
pub use server::WebServer;
