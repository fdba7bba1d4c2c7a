//! STOMP command names.
//!
//! Frames keep their command as a plain string so unknown commands survive
//! decoding; [`Command`] names the ones this client sends or understands.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

// ============================================================================
// Command
// ============================================================================

/// Known STOMP frame commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // Client frames
    /// Handshake request.
    Connect,
    /// Alternative handshake request (STOMP 1.2).
    Stomp,
    /// Publish to a destination.
    Send,
    /// Start receiving from a destination.
    Subscribe,
    /// Stop receiving from a subscription.
    Unsubscribe,
    /// Acknowledge a message.
    Ack,
    /// Reject a message.
    Nack,
    /// Begin a transaction.
    Begin,
    /// Commit a transaction.
    Commit,
    /// Abort a transaction.
    Abort,
    /// Graceful teardown.
    Disconnect,

    // Server frames
    /// Handshake accepted.
    Connected,
    /// Delivery on a subscription.
    Message,
    /// Receipt for a client frame.
    Receipt,
    /// Broker-reported fault.
    Error,
}

impl Command {
    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Stomp => "STOMP",
            Self::Send => "SEND",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Ack => "ACK",
            Self::Nack => "NACK",
            Self::Begin => "BEGIN",
            Self::Commit => "COMMIT",
            Self::Abort => "ABORT",
            Self::Disconnect => "DISCONNECT",
            Self::Connected => "CONNECTED",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
        }
    }

    /// Parses a wire name. Returns `None` for unknown commands.
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        let command = match name {
            "CONNECT" => Self::Connect,
            "STOMP" => Self::Stomp,
            "SEND" => Self::Send,
            "SUBSCRIBE" => Self::Subscribe,
            "UNSUBSCRIBE" => Self::Unsubscribe,
            "ACK" => Self::Ack,
            "NACK" => Self::Nack,
            "BEGIN" => Self::Begin,
            "COMMIT" => Self::Commit,
            "ABORT" => Self::Abort,
            "DISCONNECT" => Self::Disconnect,
            "CONNECTED" => Self::Connected,
            "MESSAGE" => Self::Message,
            "RECEIPT" => Self::Receipt,
            "ERROR" => Self::Error,
            _ => return None,
        };
        Some(command)
    }

    /// Returns `true` for frames only a broker sends.
    #[inline]
    #[must_use]
    pub const fn is_server_frame(&self) -> bool {
        matches!(
            self,
            Self::Connected | Self::Message | Self::Receipt | Self::Error
        )
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Command> for String {
    fn from(command: Command) -> Self {
        command.as_str().to_string()
    }
}

// ============================================================================
// Tests
// ============================================================================
