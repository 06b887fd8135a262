//! Error types for tether-client

use tether_net::NetError;
use thiserror::Error;

/// Failures surfaced by the mirror.
///
/// Transport failures and remote-reported failures arrive wrapped from the
/// net layer; everything else is a property of the mirror itself. Unresolved
/// update paths are deliberately NOT an error: broadcast dispatch drops them
/// per-node, and explicit navigation reports them as `Ok(None)`.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Channel-level failure (timeout, refused, reset) or a failure the
    /// remote reported for the requested operation.
    #[error(transparent)]
    Net(#[from] NetError),

    /// A structural operation only the remote tree owner can perform.
    #[error("{0} is not supported on a mirrored node")]
    NotSupported(&'static str),

    /// Attribute access outside the node's declared surface.
    #[error("node {path} has no attribute {name}")]
    NoSuchAttribute { path: String, name: String },

    /// The server sent a payload that does not parse as a descriptor.
    #[error("malformed descriptor: {0}")]
    Descriptor(String),

    /// The bootstrap probe was exhausted or aborted.
    #[error("connection to {endpoint} failed: {reason}")]
    ConnectFailed { endpoint: String, reason: String },

    /// The owning client was dropped while this node handle was still held.
    #[error("client for this mirror is gone")]
    Detached,
}

impl ClientError {
    /// Whether the failure came from the channel rather than the protocol.
    pub fn is_transport(&self) -> bool {
        matches!(self, ClientError::Net(e) if e.is_transport())
    }
}
