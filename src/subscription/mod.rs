//! Client-side subscriptions.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `registry` | Id → destination/handler table |

// ============================================================================
// Submodules
// ============================================================================

/// Id → destination/handler table.
pub mod registry;

// ============================================================================
// Re-exports
// ============================================================================

pub use registry::{MessageHandler, Subscription, SubscriptionRegistry};
