//! STOMP wire protocol.
//!
//! # Frames
//!
//! | Frame | Direction | Purpose |
//! |-------|-----------|---------|
//! | `CONNECT` | Client → Broker | Handshake with credentials and heart-beat |
//! | `CONNECTED` | Broker → Client | Handshake accepted |
//! | `SUBSCRIBE` / `UNSUBSCRIBE` | Client → Broker | Manage subscriptions |
//! | `SEND` | Client → Broker | Publish a payload |
//! | `MESSAGE` | Broker → Client | Delivery on a subscription |
//! | `ERROR` | Broker → Client | Broker-side fault |
//! | `DISCONNECT` | Client → Broker | Graceful teardown |
//!
//! A payload consisting only of an end-of-line is a heartbeat.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Known command names |
//! | `frame` | Frame type and text codec |
//! | `payload` | JSON command payload |

// ============================================================================
// Submodules
// ============================================================================

/// Known STOMP commands.
pub mod command;

/// Frame type and text codec.
pub mod frame;

/// Outbound command payload.
pub mod payload;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::Command;
pub use frame::{Decoded, Frame, HEARTBEAT, TERMINATOR, decode, encode, header};
pub use payload::{CommandPayload, JSON_CONTENT_TYPE};
