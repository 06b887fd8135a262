//! Remote endpoint identity
//!
//! One endpoint is a host plus a base port `P`. By convention with the
//! server the broadcast feed publishes on `P` and the call channel listens
//! on `P + 1`.

use std::fmt;

/// Host and base port of one remote tree server.
///
/// Also the cache key for client instances: one live client per endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Port of the request/reply call channel.
    pub fn call_port(&self) -> u16 {
        self.port + 1
    }

    /// Port of the broadcast feed channel.
    pub fn feed_port(&self) -> u16 {
        self.port
    }

    /// `host:port` address of the call channel.
    pub fn call_addr(&self) -> String {
        format!("{}:{}", self.host, self.call_port())
    }

    /// `host:port` address of the feed channel.
    pub fn feed_addr(&self) -> String {
        format!("{}:{}", self.host, self.feed_port())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}
