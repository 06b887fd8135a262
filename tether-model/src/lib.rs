//! Shared data model for the Tether remote tree mirror
//!
//! This crate provides:
//! - `NodeDescriptor`, `FunctionSignature` - server-sent tree metadata
//! - `tags`, `NodeKind` - capability markers and the closed variant set
//! - `CallEnvelope`, `Reply`, `UpdateBatch` - wire message types

pub mod descriptor;
pub mod envelope;
pub mod tags;

pub use descriptor::{FunctionSignature, NodeDescriptor};
pub use envelope::{CallEnvelope, Reply, UpdateBatch, NODES_ATTR, ROOT_PATH};
pub use tags::NodeKind;

/// The value universe carried on the wire: JSON primitives, sequences and
/// mappings. Every attribute read/write and every broadcast entry is one of
/// these.
pub use serde_json::Value;
