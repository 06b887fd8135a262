//! Transport session: one call channel, one feed loop
//!
//! A session owns the request/reply channel to one endpoint and the
//! background task draining its broadcast feed. Concurrent callers are
//! serialized by the session (one call in flight at a time); the feed loop
//! runs on its own channel and never contends with calls.

use crate::codec;
use crate::endpoint::Endpoint;
use crate::error::NetError;
use crate::transport::{CallChannel, Transport};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tether_model::{CallEnvelope, UpdateBatch, Value};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// Session tuning knobs.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// How long `call` waits for a reply before failing with `Timeout`.
    /// Finite by construction; initial connection probing relies on it.
    pub call_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            call_timeout: Duration::from_secs(1),
        }
    }
}

/// Bidirectional session with a single remote endpoint.
pub struct Session {
    transport: Arc<dyn Transport>,
    endpoint: Endpoint,
    config: SessionConfig,
    /// Request/reply channel, opened lazily and discarded after a failed
    /// exchange (a timed-out request can no longer be paired with a reply).
    call: Mutex<Option<Box<dyn CallChannel>>>,
    stop_tx: broadcast::Sender<()>,
    feed_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, endpoint: Endpoint, config: SessionConfig) -> Self {
        let (stop_tx, _) = broadcast::channel(1);
        Self {
            transport,
            endpoint,
            config,
            call: Mutex::new(None),
            stop_tx,
            feed_task: std::sync::Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Issue one request/reply exchange and decode the result.
    ///
    /// Callers are serialized on the channel lock; the wire never sees a
    /// second request before the first reply. A timeout or socket error
    /// discards the channel so the next call reconnects cleanly, and is
    /// reported to the caller without retry.
    pub async fn call(&self, envelope: &CallEnvelope) -> Result<Value, NetError> {
        let frame = codec::encode(envelope)?;

        let mut chan = self.call.lock().await;
        if chan.is_none() {
            *chan = Some(self.transport.open_call(&self.endpoint).await?);
        }
        let Some(channel) = chan.as_mut() else {
            return Err(NetError::Closed);
        };

        let reply = match tokio::time::timeout(self.config.call_timeout, channel.exchange(frame))
            .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                *chan = None;
                return Err(e);
            }
            Err(_) => {
                *chan = None;
                return Err(NetError::Timeout(self.config.call_timeout));
            }
        };
        drop(chan);

        codec::decode_reply(&reply)
    }

    /// Open the feed channel and spawn the broadcast drain loop.
    ///
    /// Every decoded batch is handed to `handler`; a malformed frame is
    /// logged and skipped, never fatal. The loop stops when `stop` is
    /// called, bounded by one receive, or when the channel closes.
    pub async fn start_feed<H, Fut>(&self, mut handler: H) -> Result<(), NetError>
    where
        H: FnMut(UpdateBatch) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        {
            let guard = self.feed_task.lock().unwrap_or_else(|e| e.into_inner());
            if guard.is_some() {
                warn!(endpoint = %self.endpoint, "feed loop already running");
                return Ok(());
            }
        }

        let mut feed = self.transport.open_feed(&self.endpoint).await?;
        let mut stop_rx = self.stop_tx.subscribe();
        let endpoint = self.endpoint.clone();

        let handle = tokio::spawn(async move {
            debug!(endpoint = %endpoint, "feed loop started");
            loop {
                tokio::select! {
                    _ = stop_rx.recv() => {
                        debug!(endpoint = %endpoint, "feed loop stopping");
                        break;
                    }
                    next = feed.recv() => match next {
                        Ok(Some(frame)) => match codec::decode::<UpdateBatch>(&frame) {
                            Ok(batch) => handler(batch).await,
                            Err(e) => warn!(error = %e, "dropping malformed update batch"),
                        },
                        Ok(None) => {
                            debug!(endpoint = %endpoint, "feed channel closed");
                            break;
                        }
                        Err(e) => {
                            warn!(error = %e, "feed receive failed");
                            break;
                        }
                    }
                }
            }
        });

        if let Ok(mut guard) = self.feed_task.lock() {
            *guard = Some(handle);
        }
        Ok(())
    }

    /// Stop the feed loop. Never blocks and never contends with an
    /// in-flight call; safe to invoke more than once.
    pub fn stop(&self) {
        let _ = self.stop_tx.send(());
    }

    /// Whether the feed loop has been started (and not yet joined).
    pub fn feed_running(&self) -> bool {
        self.feed_task
            .lock()
            .map(|g| g.as_ref().map(|h| !h.is_finished()).unwrap_or(false))
            .unwrap_or(false)
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(());
    }
}
