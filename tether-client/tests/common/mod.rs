use std::sync::Arc;
use tether_client::{Client, ConnectOptions};
use tether_net::Endpoint;
use tether_net_sim::{command, device, root_device, variable, SimServer};

/// Two devices under the root: variables var1/var2 and a reset command on
/// deviceA, var3 on deviceB.
pub fn demo_server() -> SimServer {
    SimServer::with_tree(root_device(
        "root",
        vec![
            device(
                "deviceA",
                "root.deviceA",
                vec![
                    variable("var1", "root.deviceA.var1"),
                    variable("var2", "root.deviceA.var2"),
                    command("reset", "root.deviceA.reset"),
                ],
            ),
            device(
                "deviceB",
                "root.deviceB",
                vec![variable("var3", "root.deviceB.var3")],
            ),
        ],
    ))
}

pub async fn connect(server: &SimServer) -> Client {
    Client::connect(
        Arc::new(server.transport()),
        Endpoint::new("localhost", 9099),
        ConnectOptions::default(),
    )
    .await
    .expect("connect failed")
}

/// Poll until `cond` holds, yielding to background tasks in between.
#[allow(dead_code)]
pub async fn wait_until(cond: impl Fn() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}
