//! Scripted stub server and its in-memory transport

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tether_model::{CallEnvelope, NodeDescriptor, Reply, UpdateBatch, NODES_ATTR, ROOT_PATH};
use tether_net::{codec, AsyncResult, CallChannel, Endpoint, FeedChannel, Transport};
use tokio::sync::broadcast;

type HandlerFn = Box<dyn FnMut(&CallEnvelope) -> Option<Reply> + Send>;

struct ServerInner {
    /// Scripted handler, consulted first; `None` falls through to the tree.
    handler: Mutex<Option<HandlerFn>>,
    /// Flattened descriptor tree served for `__ROOT__` and `nodes` calls.
    tree: Mutex<BTreeMap<String, NodeDescriptor>>,
    root_path: Mutex<Option<String>>,
    /// Every envelope received, in arrival order.
    calls: Mutex<Vec<CallEnvelope>>,
    /// When set, requests are accepted but never answered.
    mute: AtomicBool,
    feed_tx: broadcast::Sender<Vec<u8>>,
}

/// Stand-in for a remote tree server.
#[derive(Clone)]
pub struct SimServer {
    inner: Arc<ServerInner>,
}

impl SimServer {
    /// A server with no descriptor tree; only the scripted handler answers.
    pub fn new() -> Self {
        let (feed_tx, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(ServerInner {
                handler: Mutex::new(None),
                tree: Mutex::new(BTreeMap::new()),
                root_path: Mutex::new(None),
                calls: Mutex::new(Vec::new()),
                mute: AtomicBool::new(false),
                feed_tx,
            }),
        }
    }

    /// A server answering `__ROOT__` and `nodes` from a descriptor tree.
    ///
    /// Nested descriptors are flattened by path; responses carry skeleton
    /// children (key set preserved, payloads reduced to unloaded markers),
    /// the shape a real server sends.
    pub fn with_tree(root: NodeDescriptor) -> Self {
        let server = Self::new();
        {
            let mut tree = server.inner.tree.lock().unwrap();
            flatten(&root, &mut tree);
        }
        *server.inner.root_path.lock().unwrap() = Some(root.path.clone());
        server
    }

    /// Install a scripted handler consulted before the tree service.
    /// Returning `None` falls through.
    pub fn on_call(&self, f: impl FnMut(&CallEnvelope) -> Option<Reply> + Send + 'static) {
        *self.inner.handler.lock().unwrap() = Some(Box::new(f));
    }

    /// Stop answering requests (they are still recorded). Timeout tests.
    pub fn set_mute(&self, mute: bool) {
        self.inner.mute.store(mute, Ordering::SeqCst);
    }

    /// Snapshot of every envelope received so far.
    pub fn calls(&self) -> Vec<CallEnvelope> {
        self.inner.calls.lock().unwrap().clone()
    }

    /// How many `nodes` fetches were issued against `path`.
    pub fn nodes_calls(&self, path: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.path == path && c.attr.as_deref() == Some(NODES_ATTR))
            .count()
    }

    /// Publish an update batch to every feed subscriber.
    pub fn publish(&self, batch: &UpdateBatch) {
        if let Ok(frame) = codec::encode(batch) {
            let _ = self.inner.feed_tx.send(frame);
        }
    }

    /// Publish an empty batch (heartbeat).
    pub fn publish_heartbeat(&self) {
        self.publish(&UpdateBatch::default());
    }

    /// Publish a raw frame, bypassing the codec. Malformed-input tests.
    pub fn publish_raw(&self, frame: Vec<u8>) {
        let _ = self.inner.feed_tx.send(frame);
    }

    /// Transport wired to this server.
    pub fn transport(&self) -> SimTransport {
        SimTransport {
            inner: self.inner.clone(),
        }
    }

    fn answer(&self, envelope: &CallEnvelope) -> Reply {
        if let Some(handler) = self.inner.handler.lock().unwrap().as_mut() {
            if let Some(reply) = handler(envelope) {
                return reply;
            }
        }
        self.serve_tree(envelope)
            .unwrap_or_else(|| Reply::error(format!("unhandled call on {}", envelope.path)))
    }

    fn serve_tree(&self, envelope: &CallEnvelope) -> Option<Reply> {
        let tree = self.inner.tree.lock().unwrap();
        if envelope.path == ROOT_PATH && envelope.attr.is_none() {
            let root_path = self.inner.root_path.lock().unwrap().clone()?;
            let root = tree.get(&root_path)?;
            let value = serde_json::to_value(skeleton(root)).ok()?;
            return Some(Reply::ok(value));
        }
        if envelope.attr.as_deref() == Some(NODES_ATTR) {
            let parent = tree.get(&envelope.path)?;
            let mut children = BTreeMap::new();
            for name in parent.children.keys() {
                let child_path = format!("{}.{}", parent.path, name);
                if let Some(child) = tree.get(&child_path) {
                    children.insert(name.clone(), skeleton(child));
                }
            }
            let value = serde_json::to_value(children).ok()?;
            return Some(Reply::ok(value));
        }
        None
    }
}

impl Default for SimServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce nested child payloads to unloaded markers, keeping the key set.
fn skeleton(desc: &NodeDescriptor) -> NodeDescriptor {
    let mut out = desc.clone();
    for slot in out.children.values_mut() {
        *slot = None;
    }
    out
}

fn flatten(desc: &NodeDescriptor, out: &mut BTreeMap<String, NodeDescriptor>) {
    out.insert(desc.path.clone(), desc.clone());
    for child in desc.children.values().flatten() {
        flatten(child, out);
    }
}

/// In-memory `Transport` bound to one `SimServer`.
#[derive(Clone)]
pub struct SimTransport {
    inner: Arc<ServerInner>,
}

impl std::fmt::Debug for SimTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimTransport").finish()
    }
}

impl Transport for SimTransport {
    fn open_call<'a>(&'a self, _endpoint: &'a Endpoint) -> AsyncResult<'a, Box<dyn CallChannel>> {
        let server = SimServer {
            inner: self.inner.clone(),
        };
        Box::pin(async move { Ok(Box::new(SimCallChannel { server }) as Box<dyn CallChannel>) })
    }

    fn open_feed<'a>(&'a self, _endpoint: &'a Endpoint) -> AsyncResult<'a, Box<dyn FeedChannel>> {
        let rx = self.inner.feed_tx.subscribe();
        Box::pin(async move { Ok(Box::new(SimFeedChannel { rx }) as Box<dyn FeedChannel>) })
    }
}

struct SimCallChannel {
    server: SimServer,
}

impl CallChannel for SimCallChannel {
    fn exchange(&mut self, frame: Vec<u8>) -> AsyncResult<'_, Vec<u8>> {
        let server = self.server.clone();
        Box::pin(async move {
            let envelope: CallEnvelope = codec::decode(&frame)?;
            server.inner.calls.lock().unwrap().push(envelope.clone());
            if server.inner.mute.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            let reply = server.answer(&envelope);
            codec::encode(&reply)
        })
    }
}

struct SimFeedChannel {
    rx: broadcast::Receiver<Vec<u8>>,
}

impl FeedChannel for SimFeedChannel {
    fn recv(&mut self) -> AsyncResult<'_, Option<Vec<u8>>> {
        Box::pin(async move {
            loop {
                match self.rx.recv().await {
                    Ok(frame) => return Ok(Some(frame)),
                    // A slow subscriber skips what it missed, like a real
                    // best-effort feed.
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return Ok(None),
                }
            }
        })
    }
}
