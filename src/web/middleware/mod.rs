//! Middleware shared by every route.

mod security;

pub use security::security_headers;
