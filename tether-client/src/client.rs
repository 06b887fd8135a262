//! Client: the top-level connection to one remote tree
//!
//! A client owns the transport session, the root proxy node, the tree-wide
//! listener list, and the link monitor. Every proxy node operation funnels
//! through `ClientCore::call`, the single chokepoint to the wire.

use crate::error::ClientError;
use crate::factory;
use crate::monitor::{LinkState, MonitorId, MonitorTask};
use crate::node::{ListenerId, ProxyNode, UpdateListener};
use serde_json::Map;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tether_model::{CallEnvelope, NodeDescriptor, UpdateBatch, Value};
use tether_net::{Endpoint, Session, SessionConfig, Transport};
use tokio::sync::watch;
use tracing::{debug, info};

/// Connection establishment and liveness knobs.
///
/// The root probe is bounded: the original-style "retry forever" startup is
/// an unkillable loop, so the probe takes an attempt budget, exponential
/// backoff, and an optional abort signal instead.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub session: SessionConfig,
    /// Root-probe attempt budget; at least one attempt is always made.
    pub probe_attempts: u32,
    /// Initial delay between probe attempts, doubled up to the cap.
    pub probe_backoff: Duration,
    pub probe_backoff_cap: Duration,
    /// Flip to `true` to abort an in-progress connect.
    pub abort: Option<watch::Receiver<bool>>,
    /// Silence on the feed longer than this flips the link down.
    pub link_timeout: Duration,
    /// Cadence of the link health check while observers are registered.
    pub link_check_interval: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            probe_attempts: 20,
            probe_backoff: Duration::from_millis(250),
            probe_backoff_cap: Duration::from_secs(5),
            abort: None,
            link_timeout: Duration::from_secs(10),
            link_check_interval: Duration::from_secs(1),
        }
    }
}

/// Shared client state; proxy nodes hold a `Weak` back-reference to this.
pub(crate) struct ClientCore {
    pub(crate) session: Session,
    root: OnceLock<Arc<ProxyNode>>,
    tree_listeners: std::sync::Mutex<Vec<(ListenerId, UpdateListener)>>,
    next_listener: AtomicU64,
    pub(crate) link: std::sync::Mutex<LinkState>,
    pub(crate) monitors: std::sync::Mutex<Vec<(MonitorId, Arc<dyn Fn(bool) + Send + Sync>)>>,
    pub(crate) monitor_task: std::sync::Mutex<Option<MonitorTask>>,
    pub(crate) next_monitor: AtomicU64,
    pub(crate) link_timeout: Duration,
    pub(crate) link_check_interval: Duration,
}

impl ClientCore {
    /// The single chokepoint: every proxy node operation routes through
    /// here to the session.
    pub(crate) async fn call(&self, envelope: &CallEnvelope) -> Result<Value, ClientError> {
        Ok(self.session.call(envelope).await?)
    }

    pub(crate) fn root(&self) -> Option<Arc<ProxyNode>> {
        self.root.get().cloned()
    }

    pub(crate) fn root_name(&self) -> String {
        self.root()
            .map(|r| r.name().to_string())
            .unwrap_or_default()
    }

    /// Record that the remote was heard from.
    pub(crate) fn touch(&self) {
        if let Ok(mut link) = self.link.lock() {
            link.last_heard = tokio::time::Instant::now();
        }
    }

    pub(crate) fn linked(&self) -> bool {
        self.link.lock().map(|l| l.linked).unwrap_or(false)
    }

    pub(crate) fn add_tree_listener(&self, listener: UpdateListener) -> ListenerId {
        let id = ListenerId(self.next_listener.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut listeners) = self.tree_listeners.lock() {
            listeners.push((id, listener));
        }
        id
    }

    pub(crate) fn remove_tree_listener(&self, id: ListenerId) {
        if let Ok(mut listeners) = self.tree_listeners.lock() {
            listeners.retain(|(lid, _)| *lid != id);
        }
    }

    /// Route one broadcast batch into the mirror.
    ///
    /// Refreshes `last_heard` first (an empty batch is a pure heartbeat),
    /// then for each entry resolves the path against already-loaded
    /// subtrees only; no remote traffic ever originates here. A path the
    /// mirror cannot resolve is dropped for node listeners but still
    /// reaches every tree-wide listener.
    pub(crate) async fn dispatch_update(&self, batch: UpdateBatch) {
        self.touch();
        if batch.is_empty() {
            return;
        }

        let root = self.root();
        let global: Vec<UpdateListener> = self
            .tree_listeners
            .lock()
            .map(|l| l.iter().map(|(_, f)| f.clone()).collect())
            .unwrap_or_default();

        for (path, value) in batch.iter() {
            if let Some(root) = &root {
                match root.resolve(path, false).await {
                    Ok(Some(node)) => node.apply_update(value),
                    _ => debug!(path = %path, "update for a path the mirror has not loaded"),
                }
            }
            for listener in &global {
                listener(path, value);
            }
        }
    }
}

impl Drop for ClientCore {
    fn drop(&mut self) {
        self.session.stop();
        if let Ok(mut guard) = self.monitor_task.lock() {
            if let Some(task) = guard.take() {
                task.stop();
            }
        }
    }
}

/// Handle to one connected remote tree. Cheap to clone; all clones share
/// the same core, and the last one dropped tears the connection down.
#[derive(Clone)]
pub struct Client {
    core: Arc<ClientCore>,
    root: Arc<ProxyNode>,
}

impl Client {
    /// Connect to `endpoint` and mirror its tree.
    ///
    /// Blocks (asynchronously) on the root-descriptor probe: the initial
    /// synchronization barrier. On success the feed loop is already
    /// running and the link is marked up.
    pub async fn connect(
        transport: Arc<dyn Transport>,
        endpoint: Endpoint,
        mut options: ConnectOptions,
    ) -> Result<Self, ClientError> {
        let session = Session::new(transport, endpoint.clone(), options.session.clone());
        let descriptor = probe_root(&session, &mut options).await?;

        let core = Arc::new(ClientCore {
            session,
            root: OnceLock::new(),
            tree_listeners: std::sync::Mutex::new(Vec::new()),
            next_listener: AtomicU64::new(0),
            link: std::sync::Mutex::new(LinkState {
                linked: true,
                last_heard: tokio::time::Instant::now(),
            }),
            monitors: std::sync::Mutex::new(Vec::new()),
            monitor_task: std::sync::Mutex::new(None),
            next_monitor: AtomicU64::new(0),
            link_timeout: options.link_timeout,
            link_check_interval: options.link_check_interval,
        });

        let root = factory::build(descriptor, Arc::downgrade(&core), None, None);
        let _ = core.root.set(root.clone());

        let weak = Arc::downgrade(&core);
        core.session
            .start_feed(move |batch| {
                let weak = weak.clone();
                async move {
                    if let Some(core) = weak.upgrade() {
                        core.dispatch_update(batch).await;
                    }
                }
            })
            .await?;

        info!(root = %root.name(), endpoint = %endpoint, "connected to remote tree");
        Ok(Self { core, root })
    }

    /// The root proxy node.
    pub fn root(&self) -> &Arc<ProxyNode> {
        &self.root
    }

    pub fn endpoint(&self) -> &Endpoint {
        self.core.session.endpoint()
    }

    /// Current link liveness, derived from broadcast recency.
    pub fn linked(&self) -> bool {
        self.core.linked()
    }

    /// Issue a raw call. Prefer the proxy-node surface; this is the same
    /// chokepoint they use.
    pub async fn call(
        &self,
        path: &str,
        attr: Option<&str>,
        args: Vec<Value>,
        kwargs: Map<String, Value>,
    ) -> Result<Value, ClientError> {
        self.core
            .call(&CallEnvelope {
                path: path.to_string(),
                attr: attr.map(|a| a.to_string()),
                args,
                kwargs,
            })
            .await
    }

    /// Register a listener invoked for every broadcast entry, resolved or
    /// not.
    pub fn add_tree_listener(
        &self,
        listener: impl Fn(&str, &Value) + Send + Sync + 'static,
    ) -> ListenerId {
        self.core.add_tree_listener(Arc::new(listener))
    }

    pub fn remove_tree_listener(&self, id: ListenerId) {
        self.core.remove_tree_listener(id);
    }

    /// Register a link-state observer. The first observer starts the
    /// periodic health check.
    pub fn add_link_monitor(&self, observer: impl Fn(bool) + Send + Sync + 'static) -> MonitorId {
        self.core.clone().add_link_monitor(Arc::new(observer))
    }

    /// Remove a link-state observer. Removing the last one stops the
    /// health check.
    pub fn remove_link_monitor(&self, id: MonitorId) {
        self.core.remove_link_monitor(id);
    }

    /// Halt background reception and the health check. Calls in flight are
    /// unaffected; the mirror remains usable for synchronous calls.
    pub fn stop(&self) {
        self.core.session.stop();
        self.core.stop_monitor();
    }

    /// Identity check: two handles to the same underlying connection.
    pub fn same_instance(&self, other: &Client) -> bool {
        Arc::ptr_eq(&self.core, &other.core)
    }

    pub(crate) fn downgrade(&self) -> WeakClient {
        WeakClient {
            core: Arc::downgrade(&self.core),
            root: Arc::downgrade(&self.root),
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("endpoint", self.endpoint())
            .field("root", &self.root.name())
            .finish()
    }
}

/// Non-owning handle used by the registry cache.
pub(crate) struct WeakClient {
    core: Weak<ClientCore>,
    root: Weak<ProxyNode>,
}

impl WeakClient {
    pub(crate) fn upgrade(&self) -> Option<Client> {
        Some(Client {
            core: self.core.upgrade()?,
            root: self.root.upgrade()?,
        })
    }

    pub(crate) fn is_live(&self) -> bool {
        self.core.strong_count() > 0
    }
}

/// Repeatedly ask for the root descriptor until the server produces one.
///
/// Transport failures and null replies keep probing (the server may still
/// be starting); a remote-reported error is fatal; the attempt budget and
/// the abort signal bound the loop.
async fn probe_root(
    session: &Session,
    options: &mut ConnectOptions,
) -> Result<NodeDescriptor, ClientError> {
    let endpoint = session.endpoint().clone();
    let attempts = options.probe_attempts.max(1);
    let mut backoff = options.probe_backoff;

    for attempt in 1..=attempts {
        match session.call(&CallEnvelope::root_probe()).await {
            Ok(Value::Null) => {
                debug!(endpoint = %endpoint, attempt, "server reachable, tree not ready");
            }
            Ok(value) => {
                return serde_json::from_value(value)
                    .map_err(|e| ClientError::Descriptor(e.to_string()));
            }
            Err(e) if e.is_transport() => {
                debug!(endpoint = %endpoint, attempt, error = %e, "root probe failed");
            }
            Err(e) => return Err(e.into()),
        }

        if attempt == attempts {
            break;
        }

        let aborted = match options.abort.as_mut() {
            Some(abort) => tokio::select! {
                _ = tokio::time::sleep(backoff) => false,
                changed = abort.changed() => changed.is_ok() && *abort.borrow(),
            },
            None => {
                tokio::time::sleep(backoff).await;
                false
            }
        };
        if aborted {
            return Err(ClientError::ConnectFailed {
                endpoint: endpoint.to_string(),
                reason: "aborted".to_string(),
            });
        }

        backoff = (backoff * 2).min(options.probe_backoff_cap);
    }

    Err(ClientError::ConnectFailed {
        endpoint: endpoint.to_string(),
        reason: format!("root descriptor probe exhausted after {} attempts", attempts),
    })
}
