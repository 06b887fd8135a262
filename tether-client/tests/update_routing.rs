//! Broadcast dispatch: routing to loaded nodes, unresolved paths reaching
//! only global listeners, and feed-loop resilience to malformed frames.

mod common;

use common::{connect, demo_server, wait_until};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tether_model::UpdateBatch;

type Seen = Arc<Mutex<Vec<(String, serde_json::Value)>>>;

fn recorder() -> (Seen, impl Fn(&str, &serde_json::Value) + Send + Sync + 'static) {
    let seen: Seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    (seen, move |path: &str, value: &serde_json::Value| {
        sink.lock().unwrap().push((path.to_string(), value.clone()));
    })
}

#[tokio::test(start_paused = true)]
async fn updates_route_to_node_and_global_listeners() {
    let server = demo_server();
    let client = connect(&server).await;

    // Load down to var1 so the mirror can resolve its path.
    let device_a = client.root().child("deviceA").await.unwrap().unwrap();
    let var1 = device_a.child("var1").await.unwrap().unwrap();

    let (node_seen, node_listener) = recorder();
    var1.add_listener(node_listener).unwrap();

    let (global_seen, global_listener) = recorder();
    client.add_tree_listener(global_listener);

    let batch: UpdateBatch = [
        ("root.deviceA.var1".to_string(), json!(5)),
        ("root.unknownPath".to_string(), json!(7)),
    ]
    .into_iter()
    .collect();
    server.publish(&batch);

    wait_until(|| global_seen.lock().unwrap().len() == 2).await;

    // The node listener saw exactly its own path.
    let node_events = node_seen.lock().unwrap().clone();
    assert_eq!(node_events, vec![("root.deviceA.var1".to_string(), json!(5))]);

    // Global listeners saw every entry, the unresolved one included.
    let mut global_events = global_seen.lock().unwrap().clone();
    global_events.sort_by(|a, b| a.0.cmp(&b.0));
    assert_eq!(
        global_events,
        vec![
            ("root.deviceA.var1".to_string(), json!(5)),
            ("root.unknownPath".to_string(), json!(7)),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn updates_do_not_load_subtrees() {
    let server = demo_server();
    let client = connect(&server).await;

    let (global_seen, global_listener) = recorder();
    client.add_tree_listener(global_listener);

    // Nothing is loaded; the update cannot resolve and must not trigger
    // any nodes fetch.
    let batch: UpdateBatch = [("root.deviceA.var1".to_string(), json!(1))]
        .into_iter()
        .collect();
    server.publish(&batch);

    wait_until(|| global_seen.lock().unwrap().len() == 1).await;
    assert_eq!(server.nodes_calls("root"), 0);
    assert_eq!(server.nodes_calls("root.deviceA"), 0);
    assert!(!client.root().loaded().await);
}

#[tokio::test(start_paused = true)]
async fn removed_listener_stops_seeing_updates() {
    let server = demo_server();
    let client = connect(&server).await;
    let var1 = client
        .root()
        .find_node("root.deviceA.var1", true)
        .await
        .unwrap()
        .unwrap();

    let (seen, listener) = recorder();
    let id = var1.add_listener(listener).unwrap();

    let batch: UpdateBatch = [("root.deviceA.var1".to_string(), json!(1))]
        .into_iter()
        .collect();
    server.publish(&batch);
    wait_until(|| seen.lock().unwrap().len() == 1).await;

    var1.remove_listener(id).unwrap();
    server.publish(&batch);

    // Give the feed loop time to deliver; the count must not move.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn feed_loop_survives_malformed_batches() {
    let server = demo_server();
    let client = connect(&server).await;

    let (global_seen, global_listener) = recorder();
    client.add_tree_listener(global_listener);

    server.publish_raw(b"definitely not json".to_vec());

    let batch: UpdateBatch = [("root.deviceB.var3".to_string(), json!(3))]
        .into_iter()
        .collect();
    server.publish(&batch);

    // The good batch after the bad frame still arrives.
    wait_until(|| global_seen.lock().unwrap().len() == 1).await;
    assert_eq!(
        global_seen.lock().unwrap()[0],
        ("root.deviceB.var3".to_string(), json!(3))
    );
}
