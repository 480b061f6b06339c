//! Error types for the HTTP transport.
//!
//! Everything that reaches the layer above is collapsed into a single integer
//! code (see [`TransportError::code`]); the richer variants exist for logging
//! and for tests.

use thiserror::Error;

use super::constants::{ERROR_CODE_OTHER, MALFORMED_RESPONSE_CODE};
use super::types::RequestId;

/// Errors while encoding or decoding the bootstrap handshake.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Reply shorter than the fixed handshake layout.
    #[error("handshake reply too short: {0} units")]
    TooShort(usize),

    /// Reply was not sent as an unencrypted message.
    #[error("handshake reply carries a non-zero auth key id")]
    EncryptedReply,

    /// Declared message length does not fit the reply.
    #[error("handshake reply declares bad message length {0}")]
    BadLength(i32),

    /// Unexpected constructor in the reply body.
    #[error("unexpected constructor {0:#010x}")]
    UnexpectedConstructor(u32),

    /// Reply nonce differs from the bootstrap nonce.
    #[error("handshake nonce mismatch")]
    NonceMismatch,
}

/// Categories of request failure.
///
/// Only used for diagnostics: every category maps to the same error code
/// unless the failure carries an HTTP status.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Remote refused the TCP connection.
    #[error("connection refused")]
    ConnectionRefused,

    /// Remote closed the connection before replying.
    #[error("remote host closed")]
    RemoteHostClosed,

    /// Host name could not be resolved.
    #[error("host not found")]
    HostNotFound,

    /// Network or host unreachable.
    #[error("host unreachable")]
    Unreachable,

    /// Request timed out.
    #[error("timeout")]
    Timeout,

    /// Request was cancelled locally.
    #[error("cancelled")]
    Cancelled,

    /// Proxy refused, closed, timed out or demanded authentication.
    #[error("proxy error")]
    Proxy,

    /// Server replied with a non-success status.
    #[error("content error")]
    Content,

    /// HTTP protocol violation or invalid request.
    #[error("protocol error")]
    Protocol,

    /// Anything else at the network level.
    #[error("network error")]
    Network,
}

/// A failed HTTP round trip as reported by the request client.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{kind} (status: {status:?}): {message}")]
pub struct RequestFailure {
    /// Failure category.
    pub kind: FailureKind,
    /// HTTP status code, when the server answered at all.
    pub status: Option<u16>,
    /// Human-readable detail from the client.
    pub message: String,
}

impl RequestFailure {
    /// Create a failure without an HTTP status.
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    /// Create a failure for a non-success HTTP status.
    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: FailureKind::Content,
            status: Some(status),
            message: message.into(),
        }
    }

    /// Error code delivered to the layer above.
    ///
    /// The negated HTTP status when there is one, the generic code otherwise.
    pub fn code(&self) -> i32 {
        match self.status {
            Some(status) => -i32::from(status),
            None => ERROR_CODE_OTHER,
        }
    }
}

/// Transport layer errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Outbound buffer too short to carry a payload. No I/O was performed.
    #[error("bad outbound packet: {len} bytes")]
    Framing {
        /// Buffer length in bytes.
        len: usize,
    },

    /// Response body size is not a whole number of units, or too small.
    #[error("bad response size: {len} bytes")]
    MalformedResponse {
        /// Body length in bytes.
        len: usize,
    },

    /// Bootstrap reply could not be decoded or carried the wrong nonce.
    #[error("handshake failed: {0}")]
    Handshake(#[from] CodecError),

    /// Network-level failure of a round trip.
    #[error("request failed: {0}")]
    Request(#[from] RequestFailure),

    /// Completion for a request that is no longer tracked.
    #[error("stale completion for {0}")]
    StaleCompletion(RequestId),
}

impl TransportError {
    /// Error code delivered through the error notification.
    pub fn code(&self) -> i32 {
        match self {
            TransportError::MalformedResponse { .. } => MALFORMED_RESPONSE_CODE,
            TransportError::Request(failure) => failure.code(),
            TransportError::Framing { .. }
            | TransportError::Handshake(_)
            | TransportError::StaleCompletion(_) => ERROR_CODE_OTHER,
        }
    }

    /// Check if this error is swallowed without notifying the layer above.
    pub fn is_silent(&self) -> bool {
        matches!(self, TransportError::StaleCompletion(_))
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
