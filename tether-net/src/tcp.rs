//! TCP transport
//!
//! Length-delimited JSON frames over plain `TcpStream`s: the call channel
//! connects to the endpoint's base port + 1, the feed channel to the base
//! port, matching the server convention.

use crate::endpoint::Endpoint;
use crate::error::NetError;
use crate::framing::{MessageSink, MessageStream};
use crate::transport::{AsyncResult, CallChannel, FeedChannel, Transport};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// Production transport over TCP.
#[derive(Debug, Clone, Default)]
pub struct TcpTransport;

impl TcpTransport {
    pub fn new() -> Self {
        Self
    }
}

struct TcpCallChannel {
    sink: MessageSink<OwnedWriteHalf>,
    stream: MessageStream<OwnedReadHalf>,
}

impl CallChannel for TcpCallChannel {
    fn exchange(&mut self, frame: Vec<u8>) -> AsyncResult<'_, Vec<u8>> {
        Box::pin(async move {
            self.sink.send_frame(frame).await?;
            match self.stream.recv_frame().await? {
                Some(reply) => Ok(reply),
                None => Err(NetError::Closed),
            }
        })
    }
}

struct TcpFeedChannel {
    stream: MessageStream<OwnedReadHalf>,
    // Write half kept alive so the server does not see a half-closed socket.
    _sink: OwnedWriteHalf,
}

impl FeedChannel for TcpFeedChannel {
    fn recv(&mut self) -> AsyncResult<'_, Option<Vec<u8>>> {
        Box::pin(async move { self.stream.recv_frame().await })
    }
}

impl Transport for TcpTransport {
    fn open_call<'a>(&'a self, endpoint: &'a Endpoint) -> AsyncResult<'a, Box<dyn CallChannel>> {
        Box::pin(async move {
            let stream = TcpStream::connect(endpoint.call_addr())
                .await
                .map_err(|e| NetError::Connect(format!("{}: {}", endpoint.call_addr(), e)))?;
            let (read, write) = stream.into_split();
            Ok(Box::new(TcpCallChannel {
                sink: MessageSink::new(write),
                stream: MessageStream::new(read),
            }) as Box<dyn CallChannel>)
        })
    }

    fn open_feed<'a>(&'a self, endpoint: &'a Endpoint) -> AsyncResult<'a, Box<dyn FeedChannel>> {
        Box::pin(async move {
            let stream = TcpStream::connect(endpoint.feed_addr())
                .await
                .map_err(|e| NetError::Connect(format!("{}: {}", endpoint.feed_addr(), e)))?;
            let (read, write) = stream.into_split();
            Ok(Box::new(TcpFeedChannel {
                stream: MessageStream::new(read),
                _sink: write,
            }) as Box<dyn FeedChannel>)
        })
    }
}
