//! Error types for tool host operations.

use std::time::Duration;

use thiserror::Error;

/// Result type for tool host operations.
pub type Result<T> = std::result::Result<T, McpError>;

/// Error type for tool host operations.
#[derive(Debug, Error)]
pub enum McpError {
    /// The endpoint URL could not be used for a WebSocket connection.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The handshake did not complete within the connect bound.
    #[error("connection timeout after {}ms", .0.as_millis())]
    ConnectTimeout(Duration),

    /// The transport failed before the connection opened.
    #[error("failed to connect: {0}")]
    ConnectError(String),

    /// A tool call was attempted without an active session.
    #[error("not connected to tool host")]
    NotConnected,

    /// The host answered with an error envelope. Displays the host's message verbatim.
    #[error("{message}")]
    RemoteError {
        /// Error code, when the host supplied one.
        code: Option<i64>,
        /// Error message from the host.
        message: String,
    },

    /// The session went away while the request was outstanding.
    #[error("connection lost")]
    ConnectionLost,

    /// No response arrived within the per-request bound.
    #[error("request '{method}' timed out")]
    RequestTimeout {
        /// Method of the request that timed out.
        method: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl McpError {
    /// Create a connect error.
    pub fn connect(msg: impl Into<String>) -> Self {
        Self::ConnectError(msg.into())
    }

    /// Create a remote error from an error envelope.
    pub fn remote(code: Option<i64>, message: impl Into<String>) -> Self {
        Self::RemoteError {
            code,
            message: message.into(),
        }
    }

    /// Whether this error means the connection is gone (or never came up).
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectTimeout(_)
                | Self::ConnectError(_)
                | Self::NotConnected
                | Self::ConnectionLost
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_displays_message_verbatim() {
        let err = McpError::remote(Some(-32000), "boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_connect_timeout_display() {
        let err = McpError::ConnectTimeout(Duration::from_secs(5));
        assert_eq!(err.to_string(), "connection timeout after 5000ms");
    }

    #[test]
    fn test_connection_error_classification() {
        assert!(McpError::ConnectionLost.is_connection_error());
        assert!(McpError::NotConnected.is_connection_error());
        assert!(McpError::connect("refused").is_connection_error());
        assert!(!McpError::remote(None, "nope").is_connection_error());
        assert!(!McpError::RequestTimeout { method: "tools/call".into() }.is_connection_error());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("invalid json").unwrap_err();
        let err: McpError = json_err.into();
        assert!(matches!(err, McpError::Json(_)));
    }
}
