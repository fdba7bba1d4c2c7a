//! Fire-and-forget command publishing.
//!
//! Commands are JSON documents `{ command, params, timestamp }` sent as a
//! SEND frame. Delivery is at-most-once: nothing is queued while the
//! client is not connected and nothing is acknowledged.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::protocol::{Command, CommandPayload, Frame, JSON_CONTENT_TYPE, header};

use super::connection::{LoopCommand, LoopHandle};

// ============================================================================
// CommandPublisher
// ============================================================================

/// Sends JSON commands through a client's connection.
///
/// Obtained from [`StompClient::publisher`](crate::StompClient::publisher).
/// Cheap to clone.
#[derive(Debug, Clone)]
pub struct CommandPublisher {
    handle: LoopHandle,
}

impl CommandPublisher {
    pub(crate) fn new(handle: LoopHandle) -> Self {
        Self { handle }
    }

    /// Sends `command` with `params` to `destination`.
    ///
    /// Returns `Ok(())` without sending if the client is not connected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`](crate::Error::InvalidArgument) if
    /// `params` does not serialize to a JSON object.
    pub fn send_command<P>(&self, destination: &str, command: &str, params: &P) -> Result<()>
    where
        P: Serialize + ?Sized,
    {
        let frame = command_frame(destination, command, params)?;

        if !self.handle.state().is_connected() {
            warn!(destination, command, "Not connected, command dropped");
            return Ok(());
        }

        debug!(destination, command, "Publishing command");
        self.handle.command(LoopCommand::Send(frame));
        Ok(())
    }
}

/// Builds the SEND frame for a command, stamped with the current time.
pub(crate) fn command_frame<P>(destination: &str, command: &str, params: &P) -> Result<Frame>
where
    P: Serialize + ?Sized,
{
    let params = CommandPayload::params_from(params)?;
    let body = CommandPayload::new(command, params).to_body()?;

    Ok(Frame::new(Command::Send)
        .header(header::DESTINATION, destination)
        .header(header::CONTENT_TYPE, JSON_CONTENT_TYPE)
        .body(body))
}

// ============================================================================
// Tests
// ============================================================================
