//! Server-sent node descriptors
//!
//! A descriptor is the remote tree's introspection record for one node:
//! identity, capability tags, declared functions/properties, and the child
//! table. Descriptors are immutable once received; the mirror never edits
//! them, it only builds proxy nodes from them.

use crate::tags::NodeKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Declared signature of a remotely callable function.
///
/// Only the argument names travel; types are the server's business.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub kwargs: Vec<String>,
}

/// Introspection record for one remote node.
///
/// `children` distinguishes "exists but not yet loaded" (`None` value) from
/// "does not exist" (key absent). The child keys present here act as the
/// allow-list when the subtree is loaded later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub display_group: Option<String>,
    /// Dot-separated address in the tree; the routing key for updates.
    pub path: String,
    /// Concrete server-side class name, informational only.
    pub class_tag: String,
    /// Capability markers, see [`crate::tags`].
    #[serde(default)]
    pub base_tags: BTreeSet<String>,
    #[serde(default)]
    pub children: BTreeMap<String, Option<NodeDescriptor>>,
    #[serde(default)]
    pub functions: BTreeMap<String, FunctionSignature>,
    #[serde(default)]
    pub properties: BTreeSet<String>,
}

impl NodeDescriptor {
    /// Variant selection for the proxy, derived once from the tag set.
    pub fn kind(&self) -> NodeKind {
        NodeKind::from_tags(&self.base_tags)
    }

    /// Capability test against the raw tag set.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.base_tags.iter().any(|t| t == tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tags;

    #[test]
    fn minimal_descriptor_decodes_with_defaults() {
        let raw = r#"{"name":"var1","path":"root.devA.var1","class_tag":"UIntVariable"}"#;
        let desc: NodeDescriptor = serde_json::from_str(raw).unwrap();
        assert_eq!(desc.name, "var1");
        assert!(desc.children.is_empty());
        assert!(desc.functions.is_empty());
        assert_eq!(desc.kind(), NodeKind::Plain);
    }

    #[test]
    fn child_table_keeps_unloaded_markers() {
        let raw = r#"{
            "name": "devA",
            "path": "root.devA",
            "class_tag": "Device",
            "base_tags": ["device"],
            "children": {"var1": null}
        }"#;
        let desc: NodeDescriptor = serde_json::from_str(raw).unwrap();
        assert!(desc.has_tag(tags::DEVICE));
        // null child: exists but not loaded, distinct from a missing key
        assert_eq!(desc.children.get("var1"), Some(&None));
        assert!(!desc.children.contains_key("var2"));
    }
}
