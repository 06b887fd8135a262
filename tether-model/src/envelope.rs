//! Wire message types
//!
//! One `CallEnvelope` per synchronous exchange on the call channel, answered
//! by one `Reply`. The feed channel carries `UpdateBatch` messages with no
//! acknowledgment; an empty batch is a heartbeat.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Reserved path for the bootstrap root-descriptor fetch.
pub const ROOT_PATH: &str = "__ROOT__";
/// Reserved attribute fetching a node's child descriptors.
pub const NODES_ATTR: &str = "nodes";

/// One synchronous remote call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallEnvelope {
    pub path: String,
    /// Attribute to get/set/call on the node. `None` is the invocation
    /// sentinel: call the node itself (commands, and the bootstrap fetch).
    pub attr: Option<String>,
    #[serde(default)]
    pub args: Vec<Value>,
    #[serde(default)]
    pub kwargs: Map<String, Value>,
}

impl CallEnvelope {
    /// Zero-argument attribute fetch.
    pub fn get(path: impl Into<String>, attr: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            attr: Some(attr.into()),
            args: Vec::new(),
            kwargs: Map::new(),
        }
    }

    /// One-argument attribute write.
    pub fn set(path: impl Into<String>, attr: impl Into<String>, value: Value) -> Self {
        Self {
            path: path.into(),
            attr: Some(attr.into()),
            args: vec![value],
            kwargs: Map::new(),
        }
    }

    /// Invoke the node itself.
    pub fn invoke(path: impl Into<String>, args: Vec<Value>, kwargs: Map<String, Value>) -> Self {
        Self {
            path: path.into(),
            attr: None,
            args,
            kwargs,
        }
    }

    /// Bootstrap probe for the root descriptor.
    pub fn root_probe() -> Self {
        Self::invoke(ROOT_PATH, Vec::new(), Map::new())
    }

    /// Fetch the child descriptors of `path`.
    pub fn nodes(path: impl Into<String>) -> Self {
        Self::get(path, NODES_ATTR)
    }
}

/// Tagged result envelope for a call.
///
/// Remote failures travel as a description string, never as a serialized
/// exception object; the decode side re-raises rather than returning one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum Reply {
    Ok { value: Value },
    Error { error: String },
}

impl Reply {
    pub fn ok(value: Value) -> Self {
        Reply::Ok { value }
    }

    pub fn error(description: impl Into<String>) -> Self {
        Reply::Error {
            error: description.into(),
        }
    }
}

/// Broadcast mapping of changed path to new value since the previous batch.
///
/// Order is irrelevant and delivery is best-effort; clients tolerate missed
/// batches and rely on the link monitor for liveness.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UpdateBatch(pub BTreeMap<String, Value>);

impl UpdateBatch {
    /// An empty batch carries no changes; it only proves the link is alive.
    pub fn is_heartbeat(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, Value)> for UpdateBatch {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        UpdateBatch(iter.into_iter().collect())
    }
}
