//! Drone-specific destinations and feeds.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Category`] | Inbound message categories |
//! | [`DroneChannels`] | One drone's inbound and command destinations |
//! | [`ConnectionInfo`] | Backend connection-info document |
//! | [`DroneFeed`] | Subscriptions to every category of one drone |

// ============================================================================
// Submodules
// ============================================================================

/// Destination naming.
pub mod channels;

/// Subscriptions for one drone.
pub mod feed;

/// Backend connection-info document.
pub mod info;

// ============================================================================
// Re-exports
// ============================================================================

pub use channels::{Category, DroneChannels, DroneTopics, GUI_EXCHANGE};
pub use feed::{DroneFeed, FeedMessage};
pub use info::ConnectionInfo;
