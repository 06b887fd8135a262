//! Remote tree-mirroring client
//!
//! Attaches to a remote process that owns a hierarchical object tree
//! (devices, variables, commands) and mirrors it locally: proxy nodes
//! translate attribute reads/writes and invocations into synchronous remote
//! calls, a background feed loop applies the server's broadcast updates to
//! the mirror, and a link monitor derives connection liveness from
//! broadcast recency.
//!
//! This crate provides:
//! - `Client` / `ClientRegistry` - one live connection per endpoint
//! - `ProxyNode` - capability-gated stand-in for one remote node
//! - `MonitorId`/`ListenerId` handles for observer registration
//! - `SimpleClient` - flat path-addressed surface without a mirror

mod client;
mod error;
mod factory;
mod monitor;
mod node;
mod registry;
mod simple;

pub use client::{Client, ConnectOptions};
pub use error::ClientError;
pub use monitor::{LinkObserver, MonitorId};
pub use node::{ListenerId, ProxyNode, UpdateListener};
pub use registry::ClientRegistry;
pub use simple::SimpleClient;

pub use tether_model::{tags, NodeDescriptor, NodeKind, Value};
pub use tether_net::{Endpoint, NetError, SessionConfig, TcpTransport, Transport};
