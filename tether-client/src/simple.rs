//! Flat path-addressed client
//!
//! A thin convenience surface over the same wire protocol with no proxy
//! tree: address nodes by dotted path and get/set/exec directly. Useful
//! for scripts and foreign-language bridges that only need a handful of
//! values.

use crate::error::ClientError;
use serde_json::Map;
use std::sync::Arc;
use tether_model::{CallEnvelope, Value};
use tether_net::{Endpoint, Session, SessionConfig, Transport};

/// Path-addressed client without a mirrored tree.
pub struct SimpleClient {
    session: Session,
}

impl SimpleClient {
    /// Connect the call channel only; no broadcast subscription.
    pub fn connect(
        transport: Arc<dyn Transport>,
        endpoint: Endpoint,
        config: SessionConfig,
    ) -> Self {
        Self {
            session: Session::new(transport, endpoint, config),
        }
    }

    /// Connect and subscribe, invoking `callback` with every `(path,
    /// value)` broadcast entry.
    pub async fn connect_with_updates(
        transport: Arc<dyn Transport>,
        endpoint: Endpoint,
        config: SessionConfig,
        callback: impl Fn(&str, &Value) + Send + Sync + 'static,
    ) -> Result<Self, ClientError> {
        let client = Self::connect(transport, endpoint, config);
        let callback = Arc::new(callback);
        client
            .session
            .start_feed(move |batch| {
                let callback = callback.clone();
                async move {
                    for (path, value) in batch.iter() {
                        callback(path, value);
                    }
                }
            })
            .await?;
        Ok(client)
    }

    async fn remote_attr(&self, path: &str, attr: &str, args: Vec<Value>) -> Result<Value, ClientError> {
        Ok(self
            .session
            .call(&CallEnvelope {
                path: path.to_string(),
                attr: Some(attr.to_string()),
                args,
                kwargs: Map::new(),
            })
            .await?)
    }

    /// Read a path, converting on the server side if needed.
    pub async fn get(&self, path: &str) -> Result<Value, ClientError> {
        self.remote_attr(path, "get", Vec::new()).await
    }

    /// Read a path's display string.
    pub async fn get_disp(&self, path: &str) -> Result<Value, ClientError> {
        self.remote_attr(path, "getDisp", Vec::new()).await
    }

    /// Read a path's last known value without hardware access.
    pub async fn value(&self, path: &str) -> Result<Value, ClientError> {
        self.remote_attr(path, "value", Vec::new()).await
    }

    /// Display form of [`SimpleClient::value`].
    pub async fn value_disp(&self, path: &str) -> Result<Value, ClientError> {
        self.remote_attr(path, "valueDisp", Vec::new()).await
    }

    /// Write a path.
    pub async fn set(&self, path: &str, value: Value) -> Result<Value, ClientError> {
        self.remote_attr(path, "set", vec![value]).await
    }

    /// Write a path from a display string.
    pub async fn set_disp(&self, path: &str, value: Value) -> Result<Value, ClientError> {
        self.remote_attr(path, "setDisp", vec![value]).await
    }

    /// Execute a command node, with an optional argument.
    pub async fn exec(&self, path: &str, arg: Option<Value>) -> Result<Value, ClientError> {
        let args = arg.into_iter().collect();
        Ok(self
            .session
            .call(&CallEnvelope::invoke(path, args, Map::new()))
            .await?)
    }

    /// Halt background reception.
    pub fn stop(&self) {
        self.session.stop();
    }
}
