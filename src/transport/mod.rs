//! Transport layer.
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  StompClient    │          WebSocket           │  Broker         │
//! │  (event loop)   │◄────────────────────────────►│  (Web STOMP)    │
//! │  TextSink       │   ws://host:15674/ws         │                 │
//! │  TextStream     │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `socket` | [`Connector`] seam and WebSocket implementation |
//! | `channel` | In-memory connector for tests and embedding |
//! | `heartbeat` | Outbound keepalive timer and negotiation |

// ============================================================================
// Submodules
// ============================================================================

/// Connector seam and WebSocket implementation.
pub mod socket;

/// In-memory transport.
pub mod channel;

/// Outbound keepalive.
pub mod heartbeat;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::{BrokerSession, ChannelConnector};
pub use heartbeat::HeartbeatMonitor;
pub use socket::{Connector, TextSink, TextStream, Transport, WebSocketConnector};
