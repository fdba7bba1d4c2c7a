//! In-memory transport.
//!
//! [`ChannelConnector`] hands out channel-backed transports and gives the
//! other end of each one to the owner as a [`BrokerSession`]. Used to
//! script a broker in tests or to embed the client next to an in-process
//! broker.
//!
//! # Example
//!
//! ```ignore
//! let (connector, mut sessions) = ChannelConnector::new();
//! let client = StompClient::builder()
//!     .endpoint("ws://broker/ws")
//!     .connector(connector)
//!     .build()?;
//!
//! client.connect();
//! let mut broker = sessions.recv().await.unwrap();
//! let connect = broker.recv_frame().await.unwrap();
//! broker.send_frame(&Frame::new(Command::Connected));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use futures_util::{sink, stream};
use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::{Decoded, Frame, decode};

use super::{Connector, Transport};

// ============================================================================
// ChannelConnector
// ============================================================================

/// Connector producing in-memory transports.
#[derive(Debug)]
pub struct ChannelConnector {
    /// Where new broker ends are delivered.
    sessions: mpsc::UnboundedSender<BrokerSession>,
    /// Number of upcoming connects to refuse.
    refusals: AtomicUsize,
}

impl ChannelConnector {
    /// Creates a connector and the receiver of broker ends.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<BrokerSession>) {
        let (sessions, rx) = mpsc::unbounded_channel();
        let connector = Self {
            sessions,
            refusals: AtomicUsize::new(0),
        };
        (connector, rx)
    }

    /// Makes the next `count` connect attempts fail.
    pub fn refuse_next(&self, count: usize) {
        self.refusals.store(count, Ordering::SeqCst);
    }
}

#[async_trait]
impl Connector for ChannelConnector {
    async fn connect(&self, endpoint: &str) -> Result<Transport> {
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            debug!(endpoint, "In-memory connect refused");
            return Err(Error::connection(format!("connection to {endpoint} refused")));
        }

        let (client_tx, broker_rx) = mpsc::unbounded_channel::<String>();
        let (broker_tx, client_rx) = mpsc::unbounded_channel::<Result<String>>();

        let session = BrokerSession {
            endpoint: endpoint.to_string(),
            to_client: broker_tx,
            from_client: broker_rx,
        };
        self.sessions
            .send(session)
            .map_err(|_| Error::connection("no broker is listening"))?;

        let sink = sink::unfold(client_tx, |tx, text: String| async move {
            tx.send(text).map_err(|_| Error::ConnectionClosed)?;
            Ok::<_, Error>(tx)
        });

        let stream = stream::unfold(client_rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });

        Ok(Transport::new(Box::pin(sink), Box::pin(stream)))
    }
}

// ============================================================================
// BrokerSession
// ============================================================================

/// The broker's end of one in-memory transport.
///
/// Dropping it closes the transport as seen by the client.
#[derive(Debug)]
pub struct BrokerSession {
    /// Endpoint the client asked for.
    pub endpoint: String,
    /// Payloads towards the client.
    to_client: mpsc::UnboundedSender<Result<String>>,
    /// Payloads written by the client.
    from_client: mpsc::UnboundedReceiver<String>,
}

impl BrokerSession {
    /// Sends a raw payload to the client. Returns `false` if it is gone.
    pub fn send(&self, text: impl Into<String>) -> bool {
        self.to_client.send(Ok(text.into())).is_ok()
    }

    /// Sends an encoded frame to the client.
    pub fn send_frame(&self, frame: &Frame) -> bool {
        self.send(frame.encode())
    }

    /// Fails the client's inbound stream with an error.
    pub fn fail(&self, error: Error) -> bool {
        self.to_client.send(Err(error)).is_ok()
    }

    /// Receives the next raw payload written by the client.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Receives the next frame written by the client, skipping heartbeats
    /// and undecodable payloads.
    pub async fn recv_frame(&mut self) -> Option<Frame> {
        loop {
            let text = self.from_client.recv().await?;
            if let Some(Decoded::Frame(frame)) = decode(&text) {
                return Some(frame);
            }
        }
    }

    /// Returns the next payload already written by the client, if any.
    pub fn try_recv(&mut self) -> Option<String> {
        self.from_client.try_recv().ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use futures_util::{SinkExt, StreamExt};

    use crate::protocol::Command;

    #[tokio::test]
    async fn test_transport_pairs_with_session() {
        let (connector, mut sessions) = ChannelConnector::new();
        let mut transport = connector.connect("mem://broker").await.unwrap();
        let mut session = sessions.recv().await.unwrap();
        assert_eq!(session.endpoint, "mem://broker");

        transport
            .sink
            .send(Frame::new(Command::Connect).encode())
            .await
            .unwrap();
        assert_eq!(session.recv_frame().await.unwrap().command, "CONNECT");

        assert!(session.send("\n"));
        assert_eq!(transport.stream.next().await.unwrap().unwrap(), "\n");
    }

    #[tokio::test]
    async fn test_dropping_session_ends_stream() {
        let (connector, mut sessions) = ChannelConnector::new();
        let mut transport = connector.connect("mem://broker").await.unwrap();
        drop(sessions.recv().await.unwrap());

        assert!(transport.stream.next().await.is_none());
        assert!(transport.sink.send("x".to_string()).await.is_err());
    }

    #[tokio::test]
    async fn test_refuse_next() {
        let (connector, _sessions) = ChannelConnector::new();
        connector.refuse_next(2);

        assert!(connector.connect("mem://a").await.is_err());
        assert!(connector.connect("mem://a").await.is_err());
        assert!(connector.connect("mem://a").await.is_ok());
    }
}
