use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Default Webz.io endpoint used when `WEBZ_API_BASE_URL` is unset.
pub const DEFAULT_API_BASE_URL: &str = "https://api.webz.io/newsApiLite";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
    #[error("failed to parse {name} as integer: {source}")]
    ParseInt {
        name: String,
        #[source]
        source: std::num::ParseIntError,
    },
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Webz.io API
    pub api_token: String,
    pub api_base_url: String,
    pub request_delay: Duration,
    pub request_timeout: Duration,

    // Database
    pub database_path: PathBuf,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required environment variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            // Webz.io API
            api_token: required_env("WEBZIO_API_TOKEN")?,
            api_base_url: env_or_default("WEBZ_API_BASE_URL", DEFAULT_API_BASE_URL),
            request_delay: Duration::from_millis(parse_env_u64("REQUEST_DELAY_MS", 1000)?),
            request_timeout: Duration::from_secs(parse_env_u64("REQUEST_TIMEOUT_SECS", 30)?),

            // Database
            database_path: PathBuf::from(env_or_default(
                "DATABASE_PATH",
                "./data/webz_data.sqlite",
            )),
        })
    }

    /// Validate that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_token.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                name: "WEBZIO_API_TOKEN".to_string(),
                message: "cannot be empty".to_string(),
            });
        }
        if let Err(e) = url::Url::parse(&self.api_base_url) {
            return Err(ConfigError::InvalidValue {
                name: "WEBZ_API_BASE_URL".to_string(),
                message: format!("'{}' is not an absolute URL: {e}", self.api_base_url),
            });
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "REQUEST_TIMEOUT_SECS".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Configuration for tests: no delay between pages and a dummy token.
    ///
    /// The database is a per-process file in the temp directory, so every
    /// pooled connection opens the same database.
    #[doc(hidden)]
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            api_token: "test-token".to_string(),
            api_base_url: "http://127.0.0.1:9/newsApiLite".to_string(),
            request_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(10),
            database_path: std::env::temp_dir()
                .join(format!("webz-fetcher-test-{}.sqlite", std::process::id())),
        }
    }
}

fn required_env(name: &str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(name.to_string()))
}

fn env_or_default(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| default.to_string())
}

pub(crate) fn parse_env_u64(name: &str, default: u64) -> Result<u64, ConfigError> {
    match std::env::var(name) {
        Ok(val) if !val.is_empty() => val.parse().map_err(|e| ConfigError::ParseInt {
            name: name.to_string(),
            source: e,
        }),
        _ => Ok(default),
    }
}
