//! In-memory transport and stub server for Tether tests
//!
//! `SimServer` stands in for a remote tree server: it answers call
//! envelopes from a scripted handler and/or a descriptor tree, records
//! every envelope it receives, and publishes update batches to feed
//! subscribers. `SimServer::transport()` yields a `Transport` impl wired
//! straight to it, no sockets involved.

mod fixtures;
mod server;

pub use fixtures::{command, device, root_device, variable};
pub use server::{SimServer, SimTransport};
