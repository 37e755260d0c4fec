//! Error types for qfprom-client.
//!
//! Device-side rejections (a nonzero `error` word in a well-formed response)
//! are not errors here. They are returned as
//! [`RegisterResult::Rejected`](crate::register::RegisterResult::Rejected).

use std::time::Duration;

use thiserror::Error;

/// Main error type for all register exchange operations.
#[derive(Debug, Error)]
pub enum QfpromError {
    /// I/O error during socket operations (refused, reset, broken pipe).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Peer closed the connection before a full frame arrived.
    #[error("Connection closed after {received} of {expected} response bytes")]
    ConnectionClosed { received: usize, expected: usize },

    /// A transport-level timeout configured on the client elapsed.
    #[error("Timed out after {after:?} while {operation}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    /// Protocol error (wrong frame length, unparseable layout).
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// A previous exchange failed mid-frame; request/response alignment is lost.
    #[error("Connection desynchronized by a failed exchange, reconnect required")]
    Desynchronized,

    /// The disconnect frame was already sent on this connection.
    #[error("Session closed")]
    SessionClosed,

    /// JSON error while rendering a report.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed operator input (address, write spec, range).
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl QfpromError {
    /// Connection refused, reset, closed mid-frame or timed out.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            QfpromError::Io(_) | QfpromError::ConnectionClosed { .. } | QfpromError::Timeout { .. }
        )
    }

    /// Frame layout mismatch or a session that can no longer carry requests.
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            QfpromError::Protocol(_) | QfpromError::Desynchronized | QfpromError::SessionClosed
        )
    }
}

/// Result type alias using QfpromError.
pub type Result<T> = std::result::Result<T, QfpromError>;
