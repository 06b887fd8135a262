//! Proxy nodes: client-side stand-ins for remote tree nodes
//!
//! A proxy node translates local operations into remote calls through the
//! owning client. It caches no values: every get/set/invoke is a live round
//! trip. The only local state is the child table (lazily loaded, one-way
//! UNLOADED to LOADED) and the per-node listener set.

use crate::client::ClientCore;
use crate::error::ClientError;
use serde_json::Map;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tether_model::{CallEnvelope, FunctionSignature, NodeDescriptor, NodeKind, Value};
use tokio::sync::Mutex;

/// Callback invoked with `(path, value)` for an update.
pub type UpdateListener = Arc<dyn Fn(&str, &Value) + Send + Sync>;

/// Handle for removing a registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerId(pub(crate) u64);

/// Child table: the one-way loaded transition plus the name-keyed slots.
///
/// The slot keys come from the descriptor skeleton and never change; they
/// are the allow-list for what the remote may attach at load time. A `None`
/// slot exists but has not been resolved yet.
pub(crate) struct ChildTable {
    pub(crate) loaded: bool,
    pub(crate) slots: BTreeMap<String, Option<Arc<ProxyNode>>>,
}

/// Client-side stand-in for one remote tree node.
pub struct ProxyNode {
    pub(crate) name: String,
    pub(crate) description: String,
    pub(crate) display_group: Option<String>,
    pub(crate) path: String,
    pub(crate) class_tag: String,
    pub(crate) base_tags: BTreeSet<String>,
    pub(crate) kind: NodeKind,
    pub(crate) functions: BTreeMap<String, FunctionSignature>,
    pub(crate) properties: BTreeSet<String>,

    pub(crate) client: Weak<ClientCore>,
    pub(crate) parent: Weak<ProxyNode>,
    pub(crate) root: Weak<ProxyNode>,
    pub(crate) me: Weak<ProxyNode>,

    /// Guarded across the load round trip: concurrent readers see either
    /// the fully-unloaded or fully-loaded table, never a partial one.
    pub(crate) children: Mutex<ChildTable>,
    pub(crate) listeners: std::sync::Mutex<Vec<(ListenerId, UpdateListener)>>,
    pub(crate) next_listener: AtomicU64,
}

impl ProxyNode {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn display_group(&self) -> Option<&str> {
        self.display_group.as_deref()
    }

    /// Stable remote address; the routing key for updates.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn class_tag(&self) -> &str {
        &self.class_tag
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Capability test against the raw tag set (unknown tags included).
    pub fn has_tag(&self, tag: &str) -> bool {
        self.base_tags.iter().any(|t| t == tag)
    }

    /// Declared remote functions, by name.
    pub fn functions(&self) -> &BTreeMap<String, FunctionSignature> {
        &self.functions
    }

    /// Declared remote properties.
    pub fn properties(&self) -> &BTreeSet<String> {
        &self.properties
    }

    pub fn parent(&self) -> Option<Arc<ProxyNode>> {
        self.parent.upgrade()
    }

    pub fn tree_root(&self) -> Option<Arc<ProxyNode>> {
        self.root.upgrade()
    }

    /// Whether the child subtree has been fetched.
    pub async fn loaded(&self) -> bool {
        self.children.lock().await.loaded
    }

    fn client(&self) -> Result<Arc<ClientCore>, ClientError> {
        self.client.upgrade().ok_or(ClientError::Detached)
    }

    fn ensure_attr(&self, attr: &str) -> Result<(), ClientError> {
        if self.properties.contains(attr) || self.functions.contains_key(attr) {
            Ok(())
        } else {
            Err(ClientError::NoSuchAttribute {
                path: self.path.clone(),
                name: attr.to_string(),
            })
        }
    }

    /// Read a declared attribute. Always a remote round trip.
    pub async fn get(&self, attr: &str) -> Result<Value, ClientError> {
        self.ensure_attr(attr)?;
        self.client()?
            .call(&CallEnvelope::get(&self.path, attr))
            .await
    }

    /// Write a declared attribute. The server stays the authority on
    /// writability; an unwritable attribute comes back as a remote error.
    pub async fn set(&self, attr: &str, value: Value) -> Result<Value, ClientError> {
        self.ensure_attr(attr)?;
        self.client()?
            .call(&CallEnvelope::set(&self.path, attr, value))
            .await
    }

    /// Call a declared remote function.
    pub async fn invoke_method(
        &self,
        name: &str,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, ClientError> {
        if !self.functions.contains_key(name) {
            return Err(ClientError::NoSuchAttribute {
                path: self.path.clone(),
                name: name.to_string(),
            });
        }
        self.client()?
            .call(&CallEnvelope {
                path: self.path.clone(),
                attr: Some(name.to_string()),
                args,
                kwargs,
            })
            .await
    }

    /// Invoke the node itself. Commands and processes only.
    pub async fn invoke(
        &self,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, ClientError> {
        if !self.kind.invocable() {
            return Err(ClientError::NotSupported("invoke"));
        }
        self.client()?
            .call(&CallEnvelope::invoke(&self.path, args, kwargs))
            .await
    }

    /// Convenience read of the `value` property.
    pub async fn value(&self) -> Result<Value, ClientError> {
        self.get("value").await
    }

    /// Load the child subtree if this is the first child access.
    ///
    /// Holding the table lock across the `nodes` round trip makes the
    /// transition atomic and idempotent: exactly one fetch ever goes out,
    /// and a concurrent reader waits rather than observing half a table.
    /// The skeleton keys act as the allow-list; an unexpected remote child
    /// is ignored, a skeleton child the remote dropped stays unresolved.
    async fn ensure_loaded(&self) -> Result<tokio::sync::MutexGuard<'_, ChildTable>, ClientError> {
        let mut table = self.children.lock().await;
        if table.loaded {
            return Ok(table);
        }

        let client = self.client()?;
        let value = client.call(&CallEnvelope::nodes(&self.path)).await?;
        let fresh: BTreeMap<String, NodeDescriptor> = serde_json::from_value(value)
            .map_err(|e| ClientError::Descriptor(e.to_string()))?;

        for (name, descriptor) in fresh {
            let Some(slot) = table.slots.get_mut(&name) else {
                continue;
            };
            *slot = Some(crate::factory::build(
                descriptor,
                self.client.clone(),
                Some(self.me.clone()),
                Some(self.root.clone()),
            ));
        }
        table.loaded = true;
        Ok(table)
    }

    /// Names of all children, loaded or not.
    pub async fn child_names(&self) -> Result<Vec<String>, ClientError> {
        let table = self.ensure_loaded().await?;
        Ok(table.slots.keys().cloned().collect())
    }

    /// All resolved children.
    pub async fn children(&self) -> Result<Vec<Arc<ProxyNode>>, ClientError> {
        let table = self.ensure_loaded().await?;
        Ok(table.slots.values().flatten().cloned().collect())
    }

    /// Address one child by name; `Ok(None)` when it does not exist.
    pub async fn child(&self, name: &str) -> Result<Option<Arc<ProxyNode>>, ClientError> {
        let table = self.ensure_loaded().await?;
        Ok(table.slots.get(name).cloned().flatten())
    }

    /// Child lookup with no remote traffic; unloaded subtrees stay opaque.
    pub(crate) async fn child_if_loaded(&self, name: &str) -> Option<Arc<ProxyNode>> {
        let table = self.children.lock().await;
        table.slots.get(name).cloned().flatten()
    }

    /// Walk a dotted path starting at this node.
    ///
    /// The first segment must be this node's name (or the literal `root`).
    /// With `load` false the walk issues no remote calls and resolves only
    /// through already-loaded subtrees.
    pub(crate) async fn resolve(
        &self,
        path: &str,
        load: bool,
    ) -> Result<Option<Arc<ProxyNode>>, ClientError> {
        let mut segments = path.split('.');
        match segments.next() {
            Some(first) if first == self.name || first == "root" => {}
            _ => return Ok(None),
        }
        let Some(mut current) = self.me.upgrade() else {
            return Ok(None);
        };
        for segment in segments {
            let next = if load {
                current.child(segment).await?
            } else {
                current.child_if_loaded(segment).await
            };
            match next {
                Some(node) => current = node,
                None => return Ok(None),
            }
        }
        Ok(Some(current))
    }

    /// Resolve a dotted path to a node. Root capability.
    ///
    /// A miss is reported as `Ok(None)`, not an error: the caller asked a
    /// question, and "not found" is the answer.
    pub async fn find_node(
        &self,
        path: &str,
        load: bool,
    ) -> Result<Option<Arc<ProxyNode>>, ClientError> {
        if self.kind != NodeKind::Root {
            return Err(ClientError::NotSupported("find_node"));
        }
        self.resolve(path, load).await
    }

    /// Register an update listener on this node. Variables only.
    pub fn add_listener(
        &self,
        listener: impl Fn(&str, &Value) + Send + Sync + 'static,
    ) -> Result<ListenerId, ClientError> {
        if self.kind != NodeKind::Variable {
            return Err(ClientError::NotSupported("add_listener"));
        }
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.push((id, Arc::new(listener)));
        }
        Ok(id)
    }

    /// Remove a previously registered listener. Variables only.
    pub fn remove_listener(&self, id: ListenerId) -> Result<(), ClientError> {
        if self.kind != NodeKind::Variable {
            return Err(ClientError::NotSupported("remove_listener"));
        }
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|(lid, _)| *lid != id);
        }
        Ok(())
    }

    /// Register a tree-wide update listener. Root capability; delegates to
    /// the owning client.
    pub fn add_tree_listener(
        &self,
        listener: impl Fn(&str, &Value) + Send + Sync + 'static,
    ) -> Result<ListenerId, ClientError> {
        if self.kind != NodeKind::Root {
            return Err(ClientError::NotSupported("add_tree_listener"));
        }
        Ok(self.client()?.add_tree_listener(Arc::new(listener)))
    }

    /// Fan an update out to this node's listeners.
    ///
    /// Mutates nothing on the node: there is no value cache to refresh,
    /// reads stay live round trips. Listeners are snapshotted first so a
    /// callback may add or remove listeners without deadlocking.
    pub(crate) fn apply_update(&self, value: &Value) {
        let snapshot: Vec<UpdateListener> = match self.listeners.lock() {
            Ok(listeners) => listeners.iter().map(|(_, f)| f.clone()).collect(),
            Err(_) => return,
        };
        for listener in snapshot {
            listener(&self.path, value);
        }
    }

    // Structural operations need authority only the remote tree owner has;
    // the mirror refuses them outright rather than emulating half of them.

    pub fn attach_child(&self, _descriptor: NodeDescriptor) -> Result<(), ClientError> {
        Err(ClientError::NotSupported("attach_child"))
    }

    pub fn detach_child(&self, _name: &str) -> Result<(), ClientError> {
        Err(ClientError::NotSupported("detach_child"))
    }

    pub fn add_to_group(&self, _group: &str) -> Result<(), ClientError> {
        Err(ClientError::NotSupported("add_to_group"))
    }

    pub fn remove_from_group(&self, _group: &str) -> Result<(), ClientError> {
        Err(ClientError::NotSupported("remove_from_group"))
    }

    pub fn call_recursive(&self, _function: &str) -> Result<Value, ClientError> {
        Err(ClientError::NotSupported("call_recursive"))
    }

    pub fn export_state(&self) -> Result<Value, ClientError> {
        Err(ClientError::NotSupported("export_state"))
    }

    pub fn import_state(&self, _state: Value) -> Result<(), ClientError> {
        Err(ClientError::NotSupported("import_state"))
    }
}

impl std::fmt::Debug for ProxyNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyNode")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("class_tag", &self.class_tag)
            .finish()
    }
}
