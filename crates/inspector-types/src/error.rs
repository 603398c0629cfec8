use std::fmt;

use serde::{Deserialize, Serialize};

/// Result alias used across the Inspector Client Core workspace.
pub type Result<T> = std::result::Result<T, InspectorError>;

/// Error classification for programmatic handling.
///
/// The seven kinds in the upper block are the taxonomy a host is expected to
/// branch on (see the error handling design); the lower block are specific
/// boundary conditions raised by individual components that don't carry
/// their own recovery strategy distinct from `Cancelled`/`Transport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Underlying connection broken, HTTP non-2xx on framing, process exited.
    Transport,
    /// Outbound message failed local schema validation.
    ProtocolEncoding,
    /// Inbound message failed schema validation.
    ProtocolDecoding,
    /// Remote returned JSON-RPC -32601.
    MethodNotFound,
    /// Caller signal, host-initiated cancel, or disconnect.
    Cancelled,
    /// Request exceeded its per-call or default timeout.
    Timeout,
    /// HTTP 401/403 on transport, or invalid token exchange.
    Auth,

    /// An operation was attempted before `connect()` completed.
    NotConnected,
    /// The server did not advertise the capability the operation requires.
    CapabilityUnsupported,
    /// The operation could not complete because `disconnect()` ran concurrently.
    ConnectionClosed,
    /// A `required`-task-support tool was called with the non-streaming API.
    TaskRequired,
    /// A caller argument failed local validation (empty URI, etc).
    InvalidArgument,
    /// Catch-all for conditions with no dedicated kind.
    Internal,
}

/// The unified error type for the Inspector Client Core.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
#[error("{kind:?}: {message}")]
pub struct InspectorError {
    /// Error classification.
    pub kind: ErrorKind,
    /// Human-readable message.
    pub message: String,
}

impl InspectorError {
    /// Construct a new error of the given kind.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// `Transport` shorthand.
    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Transport, message)
    }

    /// `ProtocolEncoding` shorthand.
    pub fn protocol_encoding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProtocolEncoding, message)
    }

    /// `ProtocolDecoding` shorthand.
    pub fn protocol_decoding(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ProtocolDecoding, message)
    }

    /// `MethodNotFound` shorthand.
    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(ErrorKind::MethodNotFound, method)
    }

    /// `Cancelled` shorthand.
    pub fn cancelled(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Cancelled, message)
    }

    /// `Timeout` shorthand.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Timeout, message)
    }

    /// `Auth` shorthand.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Auth, message)
    }

    /// `NotConnected` shorthand.
    pub fn not_connected() -> Self {
        Self::new(ErrorKind::NotConnected, "session is not connected")
    }

    /// `CapabilityUnsupported` shorthand.
    pub fn capability_unsupported(capability: impl Into<String>) -> Self {
        Self::new(ErrorKind::CapabilityUnsupported, capability)
    }

    /// `ConnectionClosed` shorthand.
    pub fn connection_closed() -> Self {
        Self::new(ErrorKind::ConnectionClosed, "connection closed")
    }

    /// `TaskRequired` shorthand.
    pub fn task_required(tool: impl Into<String>) -> Self {
        Self::new(ErrorKind::TaskRequired, tool)
    }

    /// `InvalidArgument` shorthand.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// `Internal` shorthand.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_survives_display() {
        let err = InspectorError::timeout("request exceeded 10000ms");
        assert_eq!(err.kind, ErrorKind::Timeout);
        assert!(err.to_string().contains("exceeded"));
    }
}
