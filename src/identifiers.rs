//! Type-safe identifiers.
//!
//! Newtype wrappers keep client-generated ids apart from arbitrary strings
//! read off the wire.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

// ============================================================================
// SubscriptionId
// ============================================================================

/// Client-local subscription identifier.
///
/// Allocated monotonically by the
/// [`SubscriptionRegistry`](crate::SubscriptionRegistry) and never reused
/// while the client is alive. Rendered on the wire as `sub-<n>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Wire prefix for subscription ids.
    const PREFIX: &'static str = "sub-";

    /// Creates an id from its sequence number.
    #[inline]
    #[must_use]
    pub const fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Returns the sequence number.
    #[inline]
    #[must_use]
    pub const fn as_u64(&self) -> u64 {
        self.0
    }

    /// Parses the wire form (`sub-<n>`) read from a `subscription` header.
    ///
    /// Returns `None` for ids this client could not have generated.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        value
            .strip_prefix(Self::PREFIX)
            .and_then(|n| n.parse::<u64>().ok())
            .map(Self)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", Self::PREFIX, self.0)
    }
}

// ============================================================================
// ReceiptId
// ============================================================================

/// Receipt identifier attached to outbound DISCONNECT frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReceiptId(u64);

/// Process-wide receipt counter.
static NEXT_RECEIPT: AtomicU64 = AtomicU64::new(1);

impl ReceiptId {
    /// Generates the next receipt id.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(NEXT_RECEIPT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "receipt-{}", self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================
