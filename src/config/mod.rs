//! Configuration handling for the pingback service.
//!
//! Everything is read from environment variables with development defaults,
//! so a bare `cargo run --bin api` serves an in-memory site on localhost.
//! Values that are present but unparsable are rejected instead of silently
//! replaced by a default.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::site::Site;

/// Environment variable names. Public so tests and binaries can refer to them.
pub const ENV_DATABASE_URL: &str = "DATABASE_URL";
pub const ENV_BIND_ADDR: &str = "BIND_ADDR";
pub const ENV_SITE_URL: &str = "SITE_URL";
pub const ENV_SITE_NAME: &str = "SITE_NAME";
pub const ENV_FEED_PATH: &str = "FEED_PATH";
pub const ENV_FETCH_TIMEOUT_SECS: &str = "FETCH_TIMEOUT_SECS";
pub const ENV_EXCERPT_LENGTH: &str = "PINGBACK_EXCERPT_LENGTH";
pub const ENV_PING_DIRECTORIES: &str = "PING_DIRECTORIES";
pub const ENV_RATE_LIMIT: &str = "RATE_LIMIT_PER_MINUTE";

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_SITE_URL: &str = "http://localhost:8000/";
const DEFAULT_SITE_NAME: &str = "Gstudio";
const DEFAULT_FEED_PATH: &str = "feeds/";
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 10;
const DEFAULT_EXCERPT_LENGTH: usize = 300;
const DEFAULT_PING_DIRECTORIES: &str = "http://rpc.pingomatic.com/";
const DEFAULT_RATE_LIMIT: u32 = 60;

/// Application runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    database_url: Option<String>,
    bind_addr: String,
    site_url: Url,
    site_name: String,
    feed_path: String,
    fetch_timeout: Duration,
    excerpt_length: usize,
    ping_directories: Vec<String>,
    rate_limit_per_minute: u32,
}

impl Config {
    /// Load from environment variables, falling back to development defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var(ENV_DATABASE_URL)
            .ok()
            .filter(|value| !value.trim().is_empty());
        let bind_addr = env::var(ENV_BIND_ADDR).unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
        let site_url = parse_url(
            ENV_SITE_URL,
            &env::var(ENV_SITE_URL).unwrap_or_else(|_| DEFAULT_SITE_URL.to_string()),
        )?;
        let site_name = env::var(ENV_SITE_NAME).unwrap_or_else(|_| DEFAULT_SITE_NAME.to_string());
        let feed_path = env::var(ENV_FEED_PATH).unwrap_or_else(|_| DEFAULT_FEED_PATH.to_string());

        let fetch_timeout_secs: u64 =
            parse_or_default(ENV_FETCH_TIMEOUT_SECS, DEFAULT_FETCH_TIMEOUT_SECS)?;
        if fetch_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: ENV_FETCH_TIMEOUT_SECS,
                reason: "timeout must be at least one second".to_string(),
            });
        }
        let excerpt_length = parse_or_default(ENV_EXCERPT_LENGTH, DEFAULT_EXCERPT_LENGTH)?;
        let rate_limit_per_minute = parse_or_default(ENV_RATE_LIMIT, DEFAULT_RATE_LIMIT)?;

        let ping_directories = env::var(ENV_PING_DIRECTORIES)
            .unwrap_or_else(|_| DEFAULT_PING_DIRECTORIES.to_string())
            .split(',')
            .map(str::trim)
            .filter(|entry| !entry.is_empty())
            .map(|entry| parse_url(ENV_PING_DIRECTORIES, entry).map(|_| entry.to_string()))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            database_url,
            bind_addr,
            site_url,
            site_name,
            feed_path,
            fetch_timeout: Duration::from_secs(fetch_timeout_secs),
            excerpt_length,
            ping_directories,
            rate_limit_per_minute,
        })
    }

    /// Postgres connection string; `None` selects the in-memory repository.
    pub fn database_url(&self) -> Option<&str> {
        self.database_url.as_deref()
    }
    /// TCP bind address (host:port) for the HTTP server.
    pub fn bind_addr(&self) -> &str {
        &self.bind_addr
    }
    pub fn site_url(&self) -> &Url {
        &self.site_url
    }
    pub fn site_name(&self) -> &str {
        &self.site_name
    }
    pub fn feed_path(&self) -> &str {
        &self.feed_path
    }
    /// Upper bound for a single outbound request, connect included.
    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
    /// Number of characters kept around a backlink in pingback excerpts.
    pub fn excerpt_length(&self) -> usize {
        self.excerpt_length
    }
    /// Directory addresses exactly as configured.
    pub fn ping_directories(&self) -> &[String] {
        &self.ping_directories
    }
    pub fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    pub fn site(&self) -> Site {
        Site::new(self.site_url.clone(), &self.site_name, &self.feed_path)
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
        field,
        reason: format!("{raw:?}: {e}"),
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidValue {
            field,
            reason: format!("{raw:?}: only http and https are supported"),
        });
    }
    Ok(url)
}

fn parse_or_default<T>(field: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(field) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                field,
                reason: format!("{raw:?}: {e}"),
            }),
        Err(_) => Ok(default),
    }
}

/// Errors that can occur while building a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}
