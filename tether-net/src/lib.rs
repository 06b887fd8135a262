//! Transport layer for the Tether remote tree mirror
//!
//! This crate provides:
//! - `codec` - JSON encode/decode with the tagged reply envelope
//! - `MessageSink`/`MessageStream` - length-delimited framing
//! - `Transport`/`CallChannel`/`FeedChannel` - the channel seam
//! - `TcpTransport` - production transport (call at port+1, feed at port)
//! - `Session` - serialized call discipline plus the broadcast feed loop

pub mod codec;
mod endpoint;
mod error;
mod framing;
mod session;
mod tcp;
mod transport;

pub use endpoint::Endpoint;
pub use error::NetError;
pub use framing::{MessageSink, MessageStream};
pub use session::{Session, SessionConfig};
pub use tcp::TcpTransport;
pub use transport::{AsyncResult, CallChannel, FeedChannel, Transport};
