//! Proxy node construction from descriptors
//!
//! The factory turns one server-sent descriptor into the matching proxy
//! variant: kind selected once from the capability tags, declared
//! function/property tables recorded for attribute gating, child slots
//! created unresolved from the skeleton keys. Unrecognized tags grant
//! nothing and the node degrades to plain navigation.

use crate::client::ClientCore;
use crate::node::{ChildTable, ProxyNode};
use std::sync::atomic::AtomicU64;
use std::sync::{Arc, Weak};
use tether_model::NodeDescriptor;
use tokio::sync::Mutex;

/// Build the proxy for `descriptor`.
///
/// `parent`/`root` are `None` only for the tree root, whose parent and root
/// references point at itself.
pub(crate) fn build(
    descriptor: NodeDescriptor,
    client: Weak<ClientCore>,
    parent: Option<Weak<ProxyNode>>,
    root: Option<Weak<ProxyNode>>,
) -> Arc<ProxyNode> {
    let kind = descriptor.kind();
    let slots = descriptor
        .children
        .keys()
        .map(|name| (name.clone(), None))
        .collect();

    Arc::new_cyclic(|me: &Weak<ProxyNode>| ProxyNode {
        name: descriptor.name,
        description: descriptor.description,
        display_group: descriptor.display_group,
        path: descriptor.path,
        class_tag: descriptor.class_tag,
        base_tags: descriptor.base_tags,
        kind,
        functions: descriptor.functions,
        properties: descriptor.properties,
        client,
        parent: parent.unwrap_or_else(|| me.clone()),
        root: root.unwrap_or_else(|| me.clone()),
        me: me.clone(),
        children: Mutex::new(ChildTable {
            loaded: false,
            slots,
        }),
        listeners: std::sync::Mutex::new(Vec::new()),
        next_listener: AtomicU64::new(0),
    })
}
