//! Error types for the MCP starter server.

use thiserror::Error;

use crate::mcp::protocol::error_codes;

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the server.
///
/// Application-level failures (a division by zero, a client that cannot
/// sample) are not errors here: handlers turn them into a `ToolResult`
/// with `is_error` set. The variants below are the faults that surface as
/// JSON-RPC errors.
#[derive(Error, Debug)]
pub enum Error {
    // ===== Dispatch Errors =====
    #[error("Unknown capability: {0}")]
    UnknownCapability(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Handler fault: {0}")]
    HandlerFault(String),

    // ===== Protocol Errors =====
    #[error("MCP protocol error: {0}")]
    McpProtocol(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    // ===== Client Request Errors =====
    #[error("Client does not support sampling")]
    SamplingUnsupported,

    #[error("Client does not support {mode} elicitation")]
    ElicitationUnsupported { mode: &'static str },

    #[error("Client request failed: {code} {message}")]
    ClientRequest { code: i32, message: String },

    #[error("Unexpected elicitation action: {0}")]
    UnexpectedElicitationAction(String),

    #[error("Session closed")]
    SessionClosed,

    // ===== I/O Errors =====
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    // ===== HTTP Errors =====
    #[error("HTTP server error: {0}")]
    HttpServer(String),

    // ===== Internal Errors =====
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout: operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Cancelled: operation was cancelled")]
    Cancelled,
}

impl Error {
    /// JSON-RPC error code used when this error reaches the wire.
    pub fn jsonrpc_code(&self) -> i32 {
        match self {
            Self::UnknownCapability(_) | Self::InvalidArgument(_) => error_codes::INVALID_PARAMS,
            Self::MethodNotFound(_) => error_codes::METHOD_NOT_FOUND,
            Self::McpProtocol(_) => error_codes::INVALID_REQUEST,
            _ => error_codes::INTERNAL_ERROR,
        }
    }

    /// Check if this error means the client lacks an optional capability.
    ///
    /// Such failures are expected and should become error envelopes.
    pub fn is_client_capability_gap(&self) -> bool {
        matches!(
            self,
            Self::SamplingUnsupported | Self::ElicitationUnsupported { .. }
        ) || matches!(self, Self::ClientRequest { code, .. } if *code == error_codes::METHOD_NOT_FOUND)
    }

    /// Check if this error ended a suspended wait early.
    pub fn is_interrupted(&self) -> bool {
        matches!(
            self,
            Self::Cancelled | Self::Timeout { .. } | Self::SessionClosed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let unknown = Error::UnknownCapability("nope".to_string());
        assert_eq!(unknown.to_string(), "Unknown capability: nope");

        let invalid = Error::InvalidArgument("missing required field 'name'".to_string());
        assert_eq!(
            invalid.to_string(),
            "Invalid argument: missing required field 'name'"
        );

        let unsupported = Error::ElicitationUnsupported { mode: "url" };
        assert_eq!(
            unsupported.to_string(),
            "Client does not support url elicitation"
        );
    }

    #[test]
    fn test_jsonrpc_codes() {
        assert_eq!(
            Error::UnknownCapability("x".to_string()).jsonrpc_code(),
            error_codes::INVALID_PARAMS
        );
        assert_eq!(
            Error::InvalidArgument("x".to_string()).jsonrpc_code(),
            error_codes::INVALID_PARAMS
        );
        assert_eq!(
            Error::MethodNotFound("x".to_string()).jsonrpc_code(),
            error_codes::METHOD_NOT_FOUND
        );
        assert_eq!(
            Error::HandlerFault("boom".to_string()).jsonrpc_code(),
            error_codes::INTERNAL_ERROR
        );
    }

    #[test]
    fn test_client_capability_gap() {
        assert!(Error::SamplingUnsupported.is_client_capability_gap());
        assert!(Error::ElicitationUnsupported { mode: "form" }.is_client_capability_gap());
        assert!(Error::ClientRequest {
            code: error_codes::METHOD_NOT_FOUND,
            message: "no sampling".to_string()
        }
        .is_client_capability_gap());
        assert!(!Error::Cancelled.is_client_capability_gap());
        assert!(!Error::HandlerFault("x".to_string()).is_client_capability_gap());
    }

    #[test]
    fn test_timeout_and_cancelled() {
        let timeout = Error::Timeout { seconds: 60 };
        assert_eq!(
            timeout.to_string(),
            "Timeout: operation timed out after 60 seconds"
        );
        assert!(timeout.is_interrupted());

        let cancelled = Error::Cancelled;
        assert_eq!(cancelled.to_string(), "Cancelled: operation was cancelled");
        assert!(cancelled.is_interrupted());
        assert!(Error::SessionClosed.is_interrupted());
    }
}
