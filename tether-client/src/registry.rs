//! Client registry: one live client per endpoint
//!
//! An explicit, application-held cache keyed by `(host, port)` instead of
//! implicit global state. Repeated connects to the same endpoint return the
//! existing instance; entries are weak, so dropping the last client handle
//! for an endpoint tears its connection down and the stale entry is pruned
//! on the next lookup.

use crate::client::{Client, ConnectOptions, WeakClient};
use crate::error::ClientError;
use std::collections::HashMap;
use std::sync::Arc;
use tether_net::{Endpoint, TcpTransport, Transport};
use tokio::sync::Mutex;

/// Endpoint-keyed cache of live clients sharing one transport.
pub struct ClientRegistry {
    transport: Arc<dyn Transport>,
    options: ConnectOptions,
    clients: Mutex<HashMap<Endpoint, WeakClient>>,
}

impl ClientRegistry {
    pub fn new(transport: Arc<dyn Transport>, options: ConnectOptions) -> Self {
        Self {
            transport,
            options,
            clients: Mutex::new(HashMap::new()),
        }
    }

    /// Registry over the production TCP transport.
    pub fn over_tcp(options: ConnectOptions) -> Self {
        Self::new(Arc::new(TcpTransport::new()), options)
    }

    /// Connect to `(host, port)`, or return the already-connected client
    /// for that endpoint.
    ///
    /// The cache lock is held across the dial on purpose: two racing
    /// connects to one endpoint must resolve to a single instance, not two
    /// connections.
    pub async fn connect(&self, host: &str, port: u16) -> Result<Client, ClientError> {
        let endpoint = Endpoint::new(host, port);
        let mut clients = self.clients.lock().await;
        clients.retain(|_, weak| weak.is_live());

        if let Some(existing) = clients.get(&endpoint).and_then(WeakClient::upgrade) {
            return Ok(existing);
        }

        let client = Client::connect(
            self.transport.clone(),
            endpoint.clone(),
            self.options.clone(),
        )
        .await?;
        clients.insert(endpoint, client.downgrade());
        Ok(client)
    }

    /// Number of endpoints with a live client.
    pub async fn live_count(&self) -> usize {
        let mut clients = self.clients.lock().await;
        clients.retain(|_, weak| weak.is_live());
        clients.len()
    }
}
