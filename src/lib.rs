//! DroneCommand telemetry - STOMP-over-WebSocket client for drone dashboards.
//!
//! This library connects an operator dashboard to a message broker's Web
//! STOMP endpoint, multiplexes a drone's telemetry topics over a single
//! connection and keeps them alive across connection loss.
//!
//! # Architecture
//!
//! The client follows a handle/task model:
//!
//! - **Handle (`StompClient`)**: Cloneable, every call returns immediately
//! - **Event loop (background task)**: Owns the transport, the connection
//!   state, the heartbeat timer and the reconnect timer
//!
//! Key design principles:
//!
//! - Subscriptions are owned by the client, not the connection: they are
//!   re-sent after every handshake with the same ids and handlers
//! - Payloads are opaque JSON handed to registered handlers
//! - Lifecycle changes are broadcast as [`ClientEvent`]s
//! - Sends while not connected are dropped, never queued
//!
//! # Quick Start
//!
//! ```no_run
//! use dronecommand_telemetry::{Result, StompClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let client = StompClient::builder()
//!         .endpoint("ws://localhost:15674/ws")
//!         .credentials("guest", "guest")
//!         .build()?;
//!
//!     client.subscribe("/exchange/drone.gui/gui.D-01.telemetry", |payload| {
//!         println!("battery: {}", payload["battery"]);
//!     });
//!     client.connect();
//!
//!     let _ = tokio::signal::ctrl_c().await;
//!     client.disconnect();
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | [`StompClient`], builder, events and state |
//! | [`drone`] | Per-drone destinations and [`DroneFeed`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | STOMP frame codec |
//! | [`subscription`] | Subscription registry |
//! | [`transport`] | Connector seam, WebSocket and in-memory transports |

// ============================================================================
// Modules
// ============================================================================

/// STOMP client.
///
/// Use [`StompClient::builder()`] to create a configured client.
pub mod client;

/// Drone destinations and feeds.
pub mod drone;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// STOMP frame types and text codec.
pub mod protocol;

/// Client-side subscription table.
pub mod subscription;

/// Transport layer.
///
/// [`Connector`] opens a split text sink/stream; the event loop never sees
/// the underlying socket.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Client types
pub use client::{
    ClientBuilder, ClientEvent, ClientOptions, CommandPublisher, ConnectionConfig,
    ConnectionState, SessionInfo, StompClient,
};

// Drone types
pub use drone::{Category, ConnectionInfo, DroneChannels, DroneFeed, DroneTopics, FeedMessage};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ReceiptId, SubscriptionId};

// Protocol types
pub use protocol::{Command, CommandPayload, Decoded, Frame, decode, encode};

// Subscription types
pub use subscription::{MessageHandler, Subscription, SubscriptionRegistry};

// Transport types
pub use transport::{BrokerSession, ChannelConnector, Connector, Transport, WebSocketConnector};
