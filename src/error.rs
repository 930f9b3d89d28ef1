//! Error types for the Everything MCP Server
//!
//! This module defines the error hierarchy for all operations in the server.

use thiserror::Error;

/// Main error type for the Everything MCP Server
#[derive(Error, Debug)]
pub enum EverythingMcpError {
    /// Everything HTTP API errors
    #[error("Everything API error: {0}")]
    Search(#[from] SearchError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// MCP protocol errors
    #[error("MCP protocol error: {0}")]
    Mcp(#[from] McpError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Everything HTTP API errors
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("HTTP 401: the server requires authentication but no username and password were provided. Set EVERYTHING_USERNAME and EVERYTHING_PASSWORD")]
    CredentialsRequired,

    #[error("HTTP 401: authentication failed, check the username and password (current user: {username})")]
    AuthenticationFailed { username: String },

    #[error("HTTP {status}: {body}")]
    RequestFailed { status: u16, body: String },

    #[error("Invalid base URL: {url}")]
    InvalidBaseUrl { url: String },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidEnvVar { var: String, value: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },
}

/// Tool argument validation errors
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Missing required parameter: {field}")]
    MissingField { field: String },

    #[error("Invalid parameter: {name} - {message}")]
    InvalidParameter { name: String, message: String },
}

/// MCP protocol errors
#[derive(Error, Debug)]
pub enum McpError {
    #[error("Method already registered: {method}")]
    DuplicateMethod { method: String },

    #[error("Protocol error: {message}")]
    ProtocolError { message: String },

    #[error("Transport error: {message}")]
    TransportError { message: String },
}

/// Result type alias for Everything MCP operations
pub type Result<T> = std::result::Result<T, EverythingMcpError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SearchError::AuthenticationFailed {
            username: "alice".to_string(),
        };
        assert!(err.to_string().contains("alice"));

        let err = SearchError::RequestFailed {
            status: 500,
            body: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 500: boom");
    }

    #[test]
    fn test_error_conversion() {
        let err: EverythingMcpError = McpError::DuplicateMethod {
            method: "ping".to_string(),
        }
        .into();
        assert!(matches!(err, EverythingMcpError::Mcp(_)));

        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed");
        let err: EverythingMcpError = io.into();
        assert!(matches!(err, EverythingMcpError::Io(_)));
    }
}
