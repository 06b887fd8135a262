//! Link health monitoring
//!
//! A cancellable periodic task owned by the client: while at least one
//! observer is registered it compares the time since the last received
//! broadcast against the link timeout and notifies observers on
//! transitions. This is a liveness signal derived purely from broadcast
//! recency, not transport-level disconnect detection.

use crate::client::ClientCore;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Observer invoked with the new link state on each transition.
pub type LinkObserver = Arc<dyn Fn(bool) + Send + Sync>;

/// Handle for removing a registered link observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorId(pub(crate) u64);

/// Link liveness state, updated by the feed loop and read by the checker.
pub(crate) struct LinkState {
    pub(crate) linked: bool,
    pub(crate) last_heard: Instant,
}

/// Running health-check task plus its stop signal.
pub(crate) struct MonitorTask {
    handle: JoinHandle<()>,
    stop_tx: watch::Sender<bool>,
}

impl MonitorTask {
    pub(crate) fn stop(&self) {
        let _ = self.stop_tx.send(true);
    }
}

impl Drop for MonitorTask {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
        self.handle.abort();
    }
}

impl ClientCore {
    pub(crate) fn add_link_monitor(self: Arc<Self>, observer: LinkObserver) -> MonitorId {
        let id = MonitorId(self.next_monitor.fetch_add(1, Ordering::Relaxed));
        if let Ok(mut monitors) = self.monitors.lock() {
            monitors.push((id, observer));
        }
        start_monitor(&self);
        id
    }

    pub(crate) fn remove_link_monitor(&self, id: MonitorId) {
        let none_left = match self.monitors.lock() {
            Ok(mut monitors) => {
                monitors.retain(|(mid, _)| *mid != id);
                monitors.is_empty()
            }
            Err(_) => return,
        };
        if none_left {
            self.stop_monitor();
        }
    }

    pub(crate) fn stop_monitor(&self) {
        if let Ok(mut guard) = self.monitor_task.lock() {
            if let Some(task) = guard.take() {
                task.stop();
            }
        }
    }

    /// One health check: flip the link state if broadcast recency crossed
    /// the threshold, and notify observers only on an actual transition.
    fn check_link(&self) {
        let transition = {
            let Ok(mut link) = self.link.lock() else {
                return;
            };
            let stale = link.last_heard.elapsed() > self.link_timeout;
            if link.linked && stale {
                link.linked = false;
                Some(false)
            } else if !link.linked && !stale {
                link.linked = true;
                Some(true)
            } else {
                None
            }
        };

        let Some(up) = transition else { return };
        if up {
            info!(root = %self.root_name(), "heard from the remote again, link restored");
        } else {
            warn!(
                root = %self.root_name(),
                timeout = ?self.link_timeout,
                "nothing heard within the link timeout; remote may be busy"
            );
        }

        let observers: Vec<LinkObserver> = self
            .monitors
            .lock()
            .map(|m| m.iter().map(|(_, f)| f.clone()).collect())
            .unwrap_or_default();
        for observer in observers {
            observer(up);
        }
    }
}

/// Spawn the periodic check if it is not already running.
fn start_monitor(core: &Arc<ClientCore>) {
    let Ok(mut guard) = core.monitor_task.lock() else {
        return;
    };
    if guard
        .as_ref()
        .map(|t| !t.handle.is_finished())
        .unwrap_or(false)
    {
        return;
    }

    let (stop_tx, mut stop_rx) = watch::channel(false);
    let weak = Arc::downgrade(core);
    let every = core.link_check_interval;

    let handle = tokio::spawn(async move {
        debug!("link monitor started");
        let mut interval = tokio::time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = stop_rx.changed() => {
                    if *stop_rx.borrow() {
                        debug!("link monitor stopping");
                        break;
                    }
                }
                _ = interval.tick() => {
                    let Some(core) = weak.upgrade() else { break };
                    core.check_link();
                }
            }
        }
    });

    *guard = Some(MonitorTask { handle, stop_tx });
}
