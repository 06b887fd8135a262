//! Transport abstraction for the call and feed channels
//!
//! Decouples the session from socket-specific types. Production uses
//! `TcpTransport`; test harnesses provide in-memory implementations
//! (see the tether-net-sim crate).

use crate::endpoint::Endpoint;
use crate::error::NetError;
use std::fmt;
use std::future::Future;
use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type AsyncResult<'a, T> = Pin<Box<dyn Future<Output = Result<T, NetError>> + Send + 'a>>;

/// Point-to-point request channel with request/reply discipline.
///
/// Exactly one reply per frame sent; the caller must not send a second frame
/// before the first reply arrives. The session enforces this with a lock.
pub trait CallChannel: Send {
    /// Send one encoded envelope and wait for its reply frame.
    fn exchange(&mut self, frame: Vec<u8>) -> AsyncResult<'_, Vec<u8>>;
}

/// Subscription channel delivering broadcast frames.
///
/// Subscribes to everything the endpoint publishes (empty filter); there is
/// no acknowledgment and no delivery guarantee.
pub trait FeedChannel: Send {
    /// Next broadcast frame, or `None` when the channel is closed.
    fn recv(&mut self) -> AsyncResult<'_, Option<Vec<u8>>>;
}

/// Transport layer seam: opens the two channels toward one endpoint.
pub trait Transport: Send + Sync + fmt::Debug + 'static {
    /// Open the request/reply channel (endpoint base port + 1).
    fn open_call<'a>(&'a self, endpoint: &'a Endpoint) -> AsyncResult<'a, Box<dyn CallChannel>>;

    /// Open the broadcast subscription channel (endpoint base port).
    fn open_feed<'a>(&'a self, endpoint: &'a Endpoint) -> AsyncResult<'a, Box<dyn FeedChannel>>;
}
