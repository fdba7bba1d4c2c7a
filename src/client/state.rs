//! Connection state.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// ConnectionState
// ============================================================================

/// Lifecycle state of a client. Exactly one is active at a time.
///
/// ```text
/// Disconnected ─connect()─► Connecting ─CONNECTED─► Connected
///      ▲                        │  ▲                    │
///      │                  lost  │  │ timer        lost  │
///      │                        ▼  │                    ▼
///      └──disconnect()──── AwaitingReconnect ◄──────────┘
/// ```
///
/// `disconnect()` returns to `Disconnected` from every state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    /// No transport and no retry pending.
    #[default]
    Disconnected,
    /// Transport opening or handshake in flight.
    Connecting,
    /// Handshake accepted; frames flow.
    Connected,
    /// Transport lost; a reconnect timer is pending.
    AwaitingReconnect,
}

impl ConnectionState {
    /// Returns `true` if `connect()` starts a new attempt from here.
    #[inline]
    #[must_use]
    pub const fn can_connect(&self) -> bool {
        matches!(self, Self::Disconnected | Self::AwaitingReconnect)
    }

    /// Returns `true` if frames can be sent.
    #[inline]
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Returns the lowercase name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::AwaitingReconnect => "awaiting-reconnect",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_connect() {
        assert!(ConnectionState::Disconnected.can_connect());
        assert!(ConnectionState::AwaitingReconnect.can_connect());
        assert!(!ConnectionState::Connecting.can_connect());
        assert!(!ConnectionState::Connected.can_connect());
    }

    #[test]
    fn test_default_is_disconnected() {
        assert_eq!(ConnectionState::default(), ConnectionState::Disconnected);
        assert_eq!(ConnectionState::AwaitingReconnect.to_string(), "awaiting-reconnect");
    }
}
