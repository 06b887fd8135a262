//! Error types for tether-net

use std::time::Duration;
use thiserror::Error;

/// Transport and wire-level errors for call and feed channels.
///
/// `Timeout` is its own kind: a timed-out call is ambiguous (the server may
/// or may not have executed the request) and callers must be able to tell it
/// apart from a refused or reset connection. `Remote` carries a failure the
/// server reported for an otherwise healthy exchange.
#[derive(Error, Debug)]
pub enum NetError {
    #[error("connect failed: {0}")]
    Connect(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    #[error("call timed out after {0:?}")]
    Timeout(Duration),

    #[error("channel closed by peer")]
    Closed,

    #[error("remote error: {0}")]
    Remote(String),
}

impl NetError {
    /// Whether this failure happened below the protocol (socket or timeout),
    /// as opposed to an error the remote reported for the operation itself.
    pub fn is_transport(&self) -> bool {
        !matches!(self, NetError::Remote(_))
    }
}
