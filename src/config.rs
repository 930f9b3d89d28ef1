//! Configuration management for the Everything MCP Server
//!
//! Handles environment variables and configuration loading.

use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Configuration for the Everything MCP Server
#[derive(Clone)]
pub struct Config {
    /// Everything HTTP server base URL, with or without scheme
    pub base_url: String,

    /// Everything HTTP server port (0 leaves the base URL untouched)
    pub port: u16,

    /// HTTP Basic auth username
    pub username: String,

    /// HTTP Basic auth password
    pub password: String,

    /// Timeout for a single search request
    pub request_timeout: Duration,

    /// Upper bound on one MCP method handler invocation
    pub handler_timeout: Duration,

    /// Verbose diagnostics on stderr
    pub debug: bool,
}

impl Config {
    /// Create a configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        let base_url = std::env::var(env::BASE_URL)
            .ok()
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.base_url);

        let port = match std::env::var(env::PORT) {
            Ok(p) if !p.is_empty() => parse_var(env::PORT, &p)?,
            _ => defaults.port,
        };

        let request_timeout = match std::env::var(env::TIMEOUT_SECS) {
            Ok(s) if !s.is_empty() => Duration::from_secs(parse_var(env::TIMEOUT_SECS, &s)?),
            _ => defaults.request_timeout,
        };

        let handler_timeout = match std::env::var(env::HANDLER_TIMEOUT_SECS) {
            Ok(s) if !s.is_empty() => {
                Duration::from_secs(parse_var(env::HANDLER_TIMEOUT_SECS, &s)?)
            }
            _ => defaults.handler_timeout,
        };

        Ok(Self {
            base_url,
            port,
            username: std::env::var(env::USERNAME).unwrap_or_default(),
            password: std::env::var(env::PASSWORD).unwrap_or_default(),
            request_timeout,
            handler_timeout,
            debug: std::env::var(env::DEBUG).map(|v| v == "true").unwrap_or(false),
        })
    }

    /// Whether both HTTP Basic credentials are present
    pub fn has_credentials(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }

    /// Reject configurations that can never work
    pub fn validate(&self) -> Result<()> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidConfig {
                message: "base URL must not be empty".to_string(),
            }
            .into());
        }
        if self.handler_timeout.is_zero() {
            return Err(ConfigError::InvalidConfig {
                message: "handler timeout must be greater than zero".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(var: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::InvalidEnvVar {
            var: var.to_string(),
            value: value.to_string(),
        }
        .into()
    })
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: "http://localhost".to_string(),
            port: 80,
            username: String::new(),
            password: String::new(),
            request_timeout: Duration::from_secs(10),
            handler_timeout: Duration::from_secs(60),
            debug: false,
        }
    }
}

// Hand-written so the password never reaches the logs.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("base_url", &self.base_url)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"*".repeat(self.password.len()))
            .field("request_timeout", &self.request_timeout)
            .field("handler_timeout", &self.handler_timeout)
            .field("debug", &self.debug)
            .finish()
    }
}

/// Environment variable names
pub mod env {
    pub const BASE_URL: &str = "EVERYTHING_BASE_URL";
    pub const PORT: &str = "EVERYTHING_PORT";
    pub const USERNAME: &str = "EVERYTHING_USERNAME";
    pub const PASSWORD: &str = "EVERYTHING_PASSWORD";
    pub const TIMEOUT_SECS: &str = "EVERYTHING_TIMEOUT_SECS";
    pub const HANDLER_TIMEOUT_SECS: &str = "EVERYTHING_HANDLER_TIMEOUT_SECS";
    pub const DEBUG: &str = "EVERYTHING_DEBUG";
}
