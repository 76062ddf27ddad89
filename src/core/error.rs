//! Custom error types for Ferret
//!
//! Provides a unified error handling system across all modules.

use thiserror::Error;

/// Main error type for Ferret operations
#[derive(Error, Debug)]
pub enum FerretError {
    /// Missing or invalid configuration, reported before any request is sent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Upstream answered with something we cannot interpret
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Upstream answered with a non-2xx status
    #[error("Upstream API error ({status}): {body}")]
    Api { status: u16, body: String },

    /// Network or timeout errors talking to an endpoint
    #[error("Transport error: {0}")]
    Http(#[from] reqwest::Error),

    /// Tool execution errors, rendered verbatim into tool results
    #[error("{0}")]
    ToolExecution(String),

    /// Malformed caller input
    #[error("Validation error: {0}")]
    Validation(String),

    /// JSON parsing errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Conversation does not exist in the store
    #[error("Conversation not found: {0}")]
    NotFound(String),

    /// The consumer of an event stream went away
    #[error("Request cancelled")]
    Cancelled,

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),
}

/// Convenience Result type for Ferret operations
pub type Result<T> = std::result::Result<T, FerretError>;

impl FerretError {
    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a protocol violation error
    pub fn protocol(msg: impl Into<String>) -> Self {
        Self::ProtocolViolation(msg.into())
    }

    /// Create a tool execution error
    pub fn tool(msg: impl Into<String>) -> Self {
        Self::ToolExecution(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether the error came from talking to a remote endpoint
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http(_) | Self::Api { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_error_renders_verbatim() {
        let err = FerretError::tool("search failed: timeout");
        assert_eq!(err.to_string(), "search failed: timeout");
    }

    #[test]
    fn test_api_error_is_transport() {
        let err = FerretError::Api {
            status: 502,
            body: "bad gateway".to_string(),
        };
        assert!(err.is_transport());
        assert!(err.to_string().contains("502"));
        assert!(!FerretError::config("missing token").is_transport());
    }
}
