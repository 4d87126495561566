//! Configuration module for linkboard.

use serde::Deserialize;
use std::path::Path;

use crate::{ForumError, Result};

/// Minimum accepted length of the token/cookie signing secret.
pub const MIN_SECRET_LENGTH: usize = 16;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub path: String,
    /// Size of the connection pool.
    #[serde(default = "default_db_max_connections")]
    pub max_connections: u32,
}

fn default_db_path() -> String {
    "data/linkboard.db".to_string()
}

fn default_db_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            max_connections: default_db_max_connections(),
        }
    }
}

/// Site information and presentation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Site title shown in the header.
    #[serde(default = "default_site_title")]
    pub title: String,
    /// Short tagline.
    #[serde(default = "default_site_slogan")]
    pub slogan: String,
    /// Description used in the page metadata.
    #[serde(default = "default_site_description")]
    pub description: String,
    /// Number of stories or comments per listing page.
    #[serde(default = "default_stories_per_page")]
    pub stories_per_page: u32,
    /// Debug mode: detailed error bodies, templates reloaded per request.
    #[serde(default)]
    pub debug: bool,
}

fn default_site_title() -> String {
    "linkboard".to_string()
}

fn default_site_slogan() -> String {
    "links worth discussing".to_string()
}

fn default_site_description() -> String {
    "A link-discussion forum".to_string()
}

fn default_stories_per_page() -> u32 {
    30
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: default_site_title(),
            slogan: default_site_slogan(),
            description: default_site_description(),
            stories_per_page: default_stories_per_page(),
            debug: false,
        }
    }
}

/// Session cookie configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Cookie name.
    #[serde(default = "default_session_name")]
    pub name: String,
    /// Backing store: "cookie" or "memory".
    #[serde(default = "default_session_store")]
    pub store: String,
    /// Cookie lifetime in seconds.
    #[serde(default = "default_session_max_age")]
    pub max_age_secs: i64,
    /// Cookie path.
    #[serde(default = "default_session_path")]
    pub path: String,
    /// Cookie domain. Host-only cookie when unset.
    #[serde(default)]
    pub domain: Option<String>,
    /// HttpOnly flag.
    #[serde(default = "default_http_only")]
    pub http_only: bool,
    /// Secure flag.
    #[serde(default)]
    pub secure: bool,
}

fn default_session_name() -> String {
    "linkboard".to_string()
}

fn default_session_store() -> String {
    "cookie".to_string()
}

fn default_session_max_age() -> i64 {
    86400 // 1 day
}

fn default_session_path() -> String {
    "/".to_string()
}

fn default_http_only() -> bool {
    true
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: default_session_name(),
            store: default_session_store(),
            max_age_secs: default_session_max_age(),
            path: default_session_path(),
            domain: None,
            http_only: default_http_only(),
            secure: false,
        }
    }
}

/// Security configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// Secret used to derive CSRF tokens and sign session cookies.
    #[serde(default)]
    pub secret: String,
    /// CSRF token lifetime in seconds.
    #[serde(default = "default_csrf_ttl")]
    pub csrf_ttl_secs: u64,
}

fn default_csrf_ttl() -> u64 {
    86400 // 24 hours
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            csrf_ttl_secs: default_csrf_ttl(),
        }
    }
}

/// Templates configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct TemplatesConfig {
    /// Path to the templates directory.
    #[serde(default = "default_templates_path")]
    pub path: String,
    /// File suffix of template files.
    #[serde(default = "default_templates_extension")]
    pub extension: String,
}

fn default_templates_path() -> String {
    "templates".to_string()
}

fn default_templates_extension() -> String {
    ".tpl.html".to_string()
}

impl Default for TemplatesConfig {
    fn default() -> Self {
        Self {
            path: default_templates_path(),
            extension: default_templates_extension(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/linkboard.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Site information.
    #[serde(default)]
    pub site: SiteConfig,
    /// Session configuration.
    #[serde(default)]
    pub session: SessionConfig,
    /// Security configuration.
    #[serde(default)]
    pub security: SecurityConfig,
    /// Templates configuration.
    #[serde(default)]
    pub templates: TemplatesConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(ForumError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| ForumError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `LINKBOARD_SECRET`: signing secret
    /// - `LINKBOARD_DATABASE_PATH`: SQLite database path
    /// - `LINKBOARD_DEBUG`: `1`/`true` enables debug mode
    pub fn apply_env_overrides(&mut self) {
        if let Ok(secret) = std::env::var("LINKBOARD_SECRET") {
            if !secret.is_empty() {
                self.security.secret = secret;
            }
        }
        if let Ok(path) = std::env::var("LINKBOARD_DATABASE_PATH") {
            if !path.is_empty() {
                self.database.path = path;
            }
        }
        if let Ok(debug) = std::env::var("LINKBOARD_DEBUG") {
            match debug.to_lowercase().as_str() {
                "1" | "true" | "yes" => self.site.debug = true,
                "0" | "false" | "no" => self.site.debug = false,
                _ => {}
            }
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.security.secret.len() < MIN_SECRET_LENGTH {
            return Err(ForumError::Config(format!(
                "security.secret must be at least {MIN_SECRET_LENGTH} bytes. \
                 Set it in config.toml or via the LINKBOARD_SECRET environment variable."
            )));
        }
        if self.site.stories_per_page == 0 {
            return Err(ForumError::Config(
                "site.stories_per_page must be greater than 0".to_string(),
            ));
        }
        if !matches!(self.session.store.as_str(), "cookie" | "memory") {
            return Err(ForumError::Config(format!(
                "unknown session store '{}' (expected \"cookie\" or \"memory\")",
                self.session.store
            )));
        }
        Ok(())
    }
}
