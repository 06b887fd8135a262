//! Message framing using tokio-util LengthDelimitedCodec
//!
//! Provides a clean interface for sending/receiving length-prefixed JSON
//! frames over byte streams without manual buffer management.

use crate::codec;
use crate::error::NetError;
use futures_util::{SinkExt, StreamExt};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::{FramedRead, FramedWrite, LengthDelimitedCodec};

/// Framed writer for sending wire messages over a byte stream.
pub struct MessageSink<W> {
    inner: FramedWrite<W, LengthDelimitedCodec>,
}

impl<W: AsyncWrite + Unpin> MessageSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: FramedWrite::new(writer, LengthDelimitedCodec::new()),
        }
    }

    /// Send an already-encoded frame (length-prefixed).
    pub async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), NetError> {
        self.inner.send(frame.into()).await.map_err(NetError::Io)
    }

    /// Encode and send a wire message.
    pub async fn send<T: Serialize>(&mut self, msg: &T) -> Result<(), NetError> {
        self.send_frame(codec::encode(msg)?).await
    }
}

/// Framed reader for receiving wire messages from a byte stream.
pub struct MessageStream<R> {
    inner: FramedRead<R, LengthDelimitedCodec>,
}

impl<R: AsyncRead + Unpin> MessageStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: FramedRead::new(reader, LengthDelimitedCodec::new()),
        }
    }

    /// Receive the next raw frame (or `None` if the stream closed).
    pub async fn recv_frame(&mut self) -> Result<Option<Vec<u8>>, NetError> {
        match self.inner.next().await {
            Some(Ok(bytes)) => Ok(Some(bytes.to_vec())),
            Some(Err(e)) => Err(NetError::Io(e)),
            None => Ok(None),
        }
    }

    /// Receive and decode the next wire message (or `None` if closed).
    pub async fn recv<T: DeserializeOwned>(&mut self) -> Result<Option<T>, NetError> {
        match self.recv_frame().await? {
            Some(frame) => codec::decode(&frame).map(Some),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tether_model::CallEnvelope;

    #[tokio::test]
    async fn frames_cross_a_duplex_pair() {
        let (client, server) = tokio::io::duplex(4096);
        let (_, client_w) = tokio::io::split(client);
        let (server_r, _) = tokio::io::split(server);

        let mut sink = MessageSink::new(client_w);
        let mut stream = MessageStream::new(server_r);

        let env = CallEnvelope::get("root.devA.var1", "value");
        sink.send(&env).await.unwrap();
        sink.send(&CallEnvelope::set("root.devA.var1", "set", json!(9)))
            .await
            .unwrap();

        let first: CallEnvelope = stream.recv().await.unwrap().unwrap();
        assert_eq!(first, env);
        let second: CallEnvelope = stream.recv().await.unwrap().unwrap();
        assert_eq!(second.args, vec![json!(9)]);
    }
}
