//! Lifecycle events.
//!
//! Every [`StompClient`](crate::StompClient) owns a broadcast bus. Any
//! number of consumers can call
//! [`StompClient::events`](crate::StompClient::events) at any time and
//! receive the events emitted from then on.
//!
//! | Event | When |
//! |-------|------|
//! | [`ClientEvent::Connected`] | CONNECTED received, subscriptions re-sent |
//! | [`ClientEvent::Disconnected`] | Leaving `Connected`, by loss or `disconnect()` |
//! | [`ClientEvent::BrokerError`] | ERROR frame received |
//! | [`ClientEvent::TransportError`] | Open failed or transport lost before the handshake |

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::broadcast;
use tracing::trace;

use crate::protocol::{Frame, header};

// ============================================================================
// SessionInfo
// ============================================================================

/// Details from the broker's CONNECTED frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    /// Negotiated protocol version.
    pub version: Option<String>,
    /// Broker identification.
    pub server: Option<String>,
    /// Broker's `heart-beat` header.
    pub heart_beat: Option<String>,
}

impl SessionInfo {
    /// Extracts session details from a CONNECTED frame.
    #[must_use]
    pub fn from_frame(frame: &Frame) -> Self {
        let get = |key| frame.get_header(key).map(str::to_string);
        Self {
            version: get(header::VERSION),
            server: get(header::SERVER),
            heart_beat: get(header::HEART_BEAT),
        }
    }
}

// ============================================================================
// ClientEvent
// ============================================================================

/// Connection lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Handshake accepted.
    Connected(SessionInfo),
    /// Session ended.
    Disconnected,
    /// Broker sent an ERROR frame.
    BrokerError {
        /// The frame's `message` header.
        message: String,
        /// The frame body.
        details: String,
    },
    /// Transport could not be opened or failed before the handshake.
    TransportError {
        /// Failure description.
        message: String,
    },
}

// ============================================================================
// EventBus
// ============================================================================

/// Broadcast sender shared by the client handle and its event loop.
#[derive(Debug, Clone)]
pub(crate) struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    /// Creates a bus buffering up to `capacity` events per slow receiver.
    pub(crate) fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Emits an event. Having no receivers is fine.
    pub(crate) fn emit(&self, event: ClientEvent) {
        trace!(?event, receivers = self.tx.receiver_count(), "Emitting event");
        let _ = self.tx.send(event);
    }

    /// Returns a new receiver.
    pub(crate) fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::protocol::Command;

    #[test]
    fn test_session_info_from_connected() {
        let frame = Frame::new(Command::Connected)
            .header("version", "1.2")
            .header("server", "RabbitMQ/3.13")
            .header("heart-beat", "10000,10000");
        let info = SessionInfo::from_frame(&frame);

        assert_eq!(info.version.as_deref(), Some("1.2"));
        assert_eq!(info.server.as_deref(), Some("RabbitMQ/3.13"));
        assert_eq!(info.heart_beat.as_deref(), Some("10000,10000"));
    }

    #[tokio::test]
    async fn test_bus_reaches_every_receiver() {
        let bus = EventBus::new(8);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        bus.emit(ClientEvent::Disconnected);

        assert_eq!(a.recv().await.unwrap(), ClientEvent::Disconnected);
        assert_eq!(b.recv().await.unwrap(), ClientEvent::Disconnected);
    }

    #[test]
    fn test_emit_without_receivers() {
        let bus = EventBus::new(1);
        bus.emit(ClientEvent::Disconnected);
    }
}
