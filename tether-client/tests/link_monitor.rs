//! Link monitor transitions under a paused clock: down after silence, up
//! again on the next heard broadcast, observers notified exactly once per
//! transition.

mod common;

use common::{connect, demo_server, wait_until};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::advance;

type Transitions = Arc<Mutex<Vec<bool>>>;

#[tokio::test(start_paused = true)]
async fn silence_flips_the_link_down_and_a_broadcast_flips_it_back() {
    let server = demo_server();
    let client = connect(&server).await;
    assert!(client.linked());

    let transitions: Transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = transitions.clone();
    client.add_link_monitor(move |up| sink.lock().unwrap().push(up));

    // Quiet ticks inside the window produce no observer calls.
    advance(Duration::from_secs(5)).await;
    assert!(transitions.lock().unwrap().is_empty());
    assert!(client.linked());

    // Cross the threshold: exactly one down notification.
    advance(Duration::from_secs(6)).await;
    wait_until(|| !transitions.lock().unwrap().is_empty()).await;
    assert_eq!(*transitions.lock().unwrap(), vec![false]);
    assert!(!client.linked());

    // More silence: still exactly one.
    advance(Duration::from_secs(5)).await;
    assert_eq!(*transitions.lock().unwrap(), vec![false]);

    // A heartbeat refreshes last_heard; the next check flips back up once.
    server.publish_heartbeat();
    wait_until(|| client.linked()).await;
    advance(Duration::from_secs(2)).await;
    assert_eq!(*transitions.lock().unwrap(), vec![false, true]);
    assert!(client.linked());

    // And stays up with traffic inside the window.
    server.publish_heartbeat();
    advance(Duration::from_secs(2)).await;
    assert_eq!(*transitions.lock().unwrap(), vec![false, true]);
}

#[tokio::test(start_paused = true)]
async fn removing_the_last_observer_stops_the_checks() {
    let server = demo_server();
    let client = connect(&server).await;

    let transitions: Transitions = Arc::new(Mutex::new(Vec::new()));
    let sink = transitions.clone();
    let id = client.add_link_monitor(move |up| sink.lock().unwrap().push(up));
    client.remove_link_monitor(id);

    // Way past the threshold with no observers: nothing fires, and the
    // linked flag is left to the next registered check.
    advance(Duration::from_secs(30)).await;
    assert!(transitions.lock().unwrap().is_empty());

    // Re-registering restarts the periodic check.
    let sink = transitions.clone();
    client.add_link_monitor(move |up| sink.lock().unwrap().push(up));
    advance(Duration::from_secs(2)).await;
    wait_until(|| !transitions.lock().unwrap().is_empty()).await;
    assert_eq!(*transitions.lock().unwrap(), vec![false]);
}
