//! Error types for the wakebridge core.
//!
//! Per-call errors (`ResourceUnavailable`, `InvalidCookie`) are returned to the
//! remote caller that triggered them and never affect other live locks.
//! `TransportSetup` is fatal at startup. `PeerQuery` only costs the liveness
//! monitor one sweep.

use thiserror::Error;

/// Main error type for the wakebridge core.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("transport setup failed: {message}")]
    TransportSetup { message: String },

    #[error("could not obtain an idle inhibitor: {message}")]
    ResourceUnavailable { message: String },

    #[error("{0} is not an active inhibit cookie")]
    InvalidCookie(u32),

    #[error("peer enumeration failed: {message}")]
    PeerQuery { message: String },

    /// The lock was removed from the registry, but closing its underlying
    /// inhibitor reported an error.
    #[error("failed to release inhibitor for cookie {cookie}: {message}")]
    ResourceRelease { cookie: u32, message: String },
}

/// Result type alias for wakebridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;

impl BridgeError {
    /// Whether this error aborts the whole service rather than a single call.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BridgeError::TransportSetup { .. })
    }

    /// Whether this error is the caller's fault (bad cookie) rather than ours.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, BridgeError::InvalidCookie(_))
    }
}
