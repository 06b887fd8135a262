//! Capability tags granted by the remote tree
//!
//! A descriptor's `base_tags` set carries string markers for the categories
//! of remote operations a node supports. The server may send tags we do not
//! recognize; those grant nothing and the node degrades to plain navigation.

use std::collections::BTreeSet;

/// The node is the tree root (navigation + tree-wide listeners).
pub const ROOT: &str = "root";
/// The node is a device container.
pub const DEVICE: &str = "device";
/// The node is a variable (per-node update listeners).
pub const VARIABLE: &str = "variable";
/// The node is a command (directly invocable).
pub const COMMAND: &str = "command";
/// The node is a long-running process (directly invocable).
pub const PROCESS: &str = "process";

/// Closed set of proxy node variants, selected from `base_tags` once at
/// construction. Capability never changes after that.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Root,
    Device,
    Variable,
    Command,
    Process,
    Plain,
}

impl NodeKind {
    /// Select the variant for a tag set.
    ///
    /// A root tag wins over everything else (the root is also a device on
    /// the server side); process wins over command (a process is a command
    /// subclass). Unrecognized tags fall through to `Plain`.
    pub fn from_tags(tags: &BTreeSet<String>) -> Self {
        if tags.iter().any(|t| t == ROOT) {
            NodeKind::Root
        } else if tags.iter().any(|t| t == PROCESS) {
            NodeKind::Process
        } else if tags.iter().any(|t| t == COMMAND) {
            NodeKind::Command
        } else if tags.iter().any(|t| t == VARIABLE) {
            NodeKind::Variable
        } else if tags.iter().any(|t| t == DEVICE) {
            NodeKind::Device
        } else {
            NodeKind::Plain
        }
    }

    /// Whether the node itself can be invoked as a callable.
    pub fn invocable(&self) -> bool {
        matches!(self, NodeKind::Command | NodeKind::Process)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(tags: &[&str]) -> BTreeSet<String> {
        tags.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn root_wins_over_device() {
        assert_eq!(NodeKind::from_tags(&set(&["device", "root"])), NodeKind::Root);
    }

    #[test]
    fn process_wins_over_command() {
        let kind = NodeKind::from_tags(&set(&["command", "process"]));
        assert_eq!(kind, NodeKind::Process);
        assert!(kind.invocable());
    }

    #[test]
    fn unknown_tags_degrade_to_plain() {
        let kind = NodeKind::from_tags(&set(&["holographic"]));
        assert_eq!(kind, NodeKind::Plain);
        assert!(!kind.invocable());
    }
}
