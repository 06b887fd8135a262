//! Lazy subtree loading: the one-way UNLOADED to LOADED transition, the
//! single `nodes` fetch per node, and the skeleton allow-list.

mod common;

use common::{connect, demo_server};
use serde_json::json;
use tether_model::{CallEnvelope, Reply, NODES_ATTR};
use tether_net_sim::variable;

#[tokio::test(start_paused = true)]
async fn root_starts_unloaded_and_loads_exactly_once() {
    let server = demo_server();
    let client = connect(&server).await;
    let root = client.root();

    assert!(!root.loaded().await);
    assert_eq!(server.nodes_calls("root"), 0);

    // Any child access triggers the load.
    let device_a = root.child("deviceA").await.unwrap().unwrap();
    assert!(root.loaded().await);
    assert_eq!(device_a.path(), "root.deviceA");

    // Repeated child addressing is served from the table.
    for _ in 0..5 {
        root.child("deviceA").await.unwrap().unwrap();
        root.child_names().await.unwrap();
        root.children().await.unwrap();
    }
    assert_eq!(server.nodes_calls("root"), 1);

    // Loading one level does not touch the next.
    assert_eq!(server.nodes_calls("root.deviceA"), 0);
    device_a.child("var1").await.unwrap().unwrap();
    assert_eq!(server.nodes_calls("root.deviceA"), 1);
}

#[tokio::test(start_paused = true)]
async fn missing_child_is_none_not_an_error() {
    let server = demo_server();
    let client = connect(&server).await;

    let nobody = client.root().child("deviceZ").await.unwrap();
    assert!(nobody.is_none());
}

#[tokio::test(start_paused = true)]
async fn skeleton_keys_are_the_allow_list() {
    let server = demo_server();

    // Answer deviceA's nodes fetch with one expected child and one the
    // skeleton never declared.
    server.on_call(|env: &CallEnvelope| {
        if env.path == "root.deviceA" && env.attr.as_deref() == Some(NODES_ATTR) {
            let var1 = serde_json::to_value(variable("var1", "root.deviceA.var1")).unwrap();
            let ghost = serde_json::to_value(variable("ghost", "root.deviceA.ghost")).unwrap();
            return Some(Reply::ok(json!({"var1": var1, "ghost": ghost})));
        }
        None
    });

    let client = connect(&server).await;
    let device_a = client.root().child("deviceA").await.unwrap().unwrap();

    // The undeclared child was ignored outright.
    assert!(device_a.child("ghost").await.unwrap().is_none());

    // var1 resolved; var2 stayed a known-but-unresolved name because the
    // remote stopped reporting it.
    assert!(device_a.child("var1").await.unwrap().is_some());
    assert!(device_a.child("var2").await.unwrap().is_none());
    let names = device_a.child_names().await.unwrap();
    assert!(names.contains(&"var2".to_string()));

    let resolved: Vec<String> = device_a
        .children()
        .await
        .unwrap()
        .iter()
        .map(|n| n.name().to_string())
        .collect();
    assert_eq!(resolved, vec!["var1".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn parent_and_root_backrefs_are_wired() {
    let server = demo_server();
    let client = connect(&server).await;
    let root = client.root();

    let device_a = root.child("deviceA").await.unwrap().unwrap();
    let var1 = device_a.child("var1").await.unwrap().unwrap();

    assert_eq!(var1.parent().unwrap().path(), "root.deviceA");
    assert_eq!(var1.tree_root().unwrap().path(), "root");
    // The root's parent is itself.
    assert_eq!(root.parent().unwrap().path(), "root");
}
