//! Call-channel discipline tests against stub transports: strict
//! request/reply pairing, timeout reporting, and channel re-open after a
//! timed-out exchange.

use serde_json::json;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tether_model::{CallEnvelope, Reply};
use tether_net::{
    codec, AsyncResult, CallChannel, Endpoint, FeedChannel, NetError, Session, SessionConfig,
    Transport,
};

/// Replies to every envelope after a short delay, and asserts that a second
/// request is never sent while the first is still unanswered.
struct PairedChannel {
    busy: Arc<AtomicBool>,
    log: Arc<Mutex<Vec<CallEnvelope>>>,
}

impl CallChannel for PairedChannel {
    fn exchange(&mut self, frame: Vec<u8>) -> AsyncResult<'_, Vec<u8>> {
        let busy = self.busy.clone();
        let log = self.log.clone();
        Box::pin(async move {
            assert!(
                !busy.swap(true, Ordering::SeqCst),
                "second request sent before first reply was received"
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
            let env: CallEnvelope = codec::decode(&frame)?;
            log.lock().unwrap().push(env);
            busy.store(false, Ordering::SeqCst);
            codec::encode(&Reply::ok(json!("pong")))
        })
    }
}

/// Accepts the request and never replies.
struct SilentChannel;

impl CallChannel for SilentChannel {
    fn exchange(&mut self, _frame: Vec<u8>) -> AsyncResult<'_, Vec<u8>> {
        Box::pin(std::future::pending())
    }
}

struct IdleFeed;

impl FeedChannel for IdleFeed {
    fn recv(&mut self) -> AsyncResult<'_, Option<Vec<u8>>> {
        Box::pin(std::future::pending())
    }
}

/// Stub transport handing out channels by mode; counts call-channel opens.
#[derive(Debug)]
struct StubTransport {
    opens: AtomicUsize,
    /// Channels whose open index (1-based) is below this stay silent.
    silent_below: usize,
    busy: Arc<AtomicBool>,
    log: Arc<Mutex<Vec<CallEnvelope>>>,
}

impl StubTransport {
    fn paired() -> Self {
        Self::silent_until(0)
    }

    fn silent_until(silent_below: usize) -> Self {
        Self {
            opens: AtomicUsize::new(0),
            silent_below,
            busy: Arc::new(AtomicBool::new(false)),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl Transport for StubTransport {
    fn open_call<'a>(&'a self, _endpoint: &'a Endpoint) -> AsyncResult<'a, Box<dyn CallChannel>> {
        let n = self.opens.fetch_add(1, Ordering::SeqCst) + 1;
        let busy = self.busy.clone();
        let log = self.log.clone();
        let silent = n <= self.silent_below;
        Box::pin(async move {
            if silent {
                Ok(Box::new(SilentChannel) as Box<dyn CallChannel>)
            } else {
                Ok(Box::new(PairedChannel { busy, log }) as Box<dyn CallChannel>)
            }
        })
    }

    fn open_feed<'a>(&'a self, _endpoint: &'a Endpoint) -> AsyncResult<'a, Box<dyn FeedChannel>> {
        Box::pin(async move { Ok(Box::new(IdleFeed) as Box<dyn FeedChannel>) })
    }
}

fn session_with(transport: Arc<StubTransport>) -> Session {
    Session::new(
        transport,
        Endpoint::new("localhost", 9099),
        SessionConfig::default(),
    )
}

#[tokio::test(start_paused = true)]
async fn concurrent_calls_are_not_interleaved_on_the_wire() {
    let transport = Arc::new(StubTransport::paired());
    let session = Arc::new(session_with(transport.clone()));

    let a = {
        let s = session.clone();
        tokio::spawn(async move { s.call(&CallEnvelope::get("root.a", "value")).await })
    };
    let b = {
        let s = session.clone();
        tokio::spawn(async move { s.call(&CallEnvelope::get("root.b", "value")).await })
    };

    // A pairing violation panics inside exchange and fails the join.
    a.await.unwrap().unwrap();
    b.await.unwrap().unwrap();

    let log = transport.log.lock().unwrap();
    assert_eq!(log.len(), 2);
    // Both calls shared one channel.
    assert_eq!(transport.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn unanswered_call_times_out_without_retry() {
    let transport = Arc::new(StubTransport::silent_until(usize::MAX));
    let session = session_with(transport.clone());

    let err = session
        .call(&CallEnvelope::get("root.a", "value"))
        .await
        .unwrap_err();
    match err {
        NetError::Timeout(t) => assert_eq!(t, SessionConfig::default().call_timeout),
        other => panic!("expected timeout, got {:?}", other),
    }
    // No silent retry: the channel was opened exactly once.
    assert_eq!(transport.opens.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn channel_reopens_after_a_timed_out_exchange() {
    // First opened channel never replies; the replacement behaves.
    let transport = Arc::new(StubTransport::silent_until(1));
    let session = session_with(transport.clone());

    let err = session
        .call(&CallEnvelope::get("root.a", "value"))
        .await
        .unwrap_err();
    assert!(matches!(err, NetError::Timeout(_)));

    let value = session
        .call(&CallEnvelope::get("root.a", "value"))
        .await
        .unwrap();
    assert_eq!(value, json!("pong"));
    assert_eq!(transport.opens.load(Ordering::SeqCst), 2);
}
