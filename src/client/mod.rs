//! STOMP client.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`StompClient`] | Cloneable handle to one broker connection |
//! | [`ClientBuilder`] | Fluent configuration builder |
//! | [`CommandPublisher`] | Fire-and-forget JSON commands |
//! | [`ConnectionState`] | Lifecycle state |
//! | [`ClientEvent`] | Lifecycle notifications |
//!
//! # Example
//!
//! ```no_run
//! use dronecommand_telemetry::{ClientEvent, StompClient};
//!
//! # async fn example() -> dronecommand_telemetry::Result<()> {
//! let client = StompClient::builder()
//!     .endpoint("ws://localhost:15674/ws")
//!     .build()?;
//!
//! let mut events = client.events();
//! client.connect();
//!
//! while let Ok(event) = events.recv().await {
//!     if let ClientEvent::Connected(info) = event {
//!         println!("connected, version {:?}", info.version);
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for client configuration.
pub mod builder;

/// Endpoint, credentials and tunables.
pub mod config;

/// Client handle.
pub mod core;

/// Lifecycle events.
pub mod events;

/// JSON command publishing.
pub mod publisher;

/// Connection state.
pub mod state;

mod connection;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ClientBuilder;
pub use config::{
    ClientOptions, ConnectionConfig, DEFAULT_ACCEPT_VERSION, DEFAULT_EVENT_CAPACITY,
    DEFAULT_HEARTBEAT, DEFAULT_RECONNECT_DELAY, DEFAULT_VIRTUAL_HOST,
};
pub use core::StompClient;
pub use events::{ClientEvent, SessionInfo};
pub use publisher::CommandPublisher;
pub use state::ConnectionState;
