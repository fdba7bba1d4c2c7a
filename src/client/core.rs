//! STOMP client handle.
//!
//! [`StompClient`] is a cheap, cloneable handle to one broker connection.
//! The connection itself lives in a background task; every method here
//! returns immediately.
//!
//! # Example
//!
//! ```no_run
//! use dronecommand_telemetry::StompClient;
//!
//! # async fn example() -> dronecommand_telemetry::Result<()> {
//! let client = StompClient::builder()
//!     .endpoint("ws://localhost:15674/ws")
//!     .credentials("guest", "guest")
//!     .build()?;
//!
//! client.subscribe("/exchange/drone.gui/gui.D-01.telemetry", |payload| {
//!     println!("telemetry: {payload}");
//! });
//! client.connect();
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::SubscriptionId;
use crate::protocol::{Command, Frame, header};
use crate::subscription::SubscriptionRegistry;
use crate::transport::Connector;

use super::builder::ClientBuilder;
use super::config::{ClientOptions, ConnectionConfig};
use super::connection::{EventLoop, LoopCommand, LoopHandle};
use super::events::{ClientEvent, EventBus};
use super::publisher::CommandPublisher;
use super::state::ConnectionState;

// ============================================================================
// Types
// ============================================================================

/// State shared by all clones of a client.
struct ClientInner {
    /// Endpoint and credentials.
    config: ConnectionConfig,
    /// Sender side of the event loop.
    handle: LoopHandle,
    /// Subscriptions, shared with the event loop.
    registry: Arc<Mutex<SubscriptionRegistry>>,
    /// Lifecycle notifications.
    events: EventBus,
}

// ============================================================================
// StompClient
// ============================================================================

/// Handle to a STOMP-over-WebSocket connection.
///
/// The connection is owned by a background task spawned at build time.
/// Dropping the last handle (including publishers obtained from it)
/// disconnects and stops the task.
///
/// Handlers that capture a clone of the client keep it alive until they
/// are unsubscribed.
#[derive(Clone)]
pub struct StompClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for StompClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StompClient")
            .field("endpoint", &self.inner.config.endpoint_url)
            .field("state", &self.state())
            .field("subscriptions", &self.subscription_count())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// StompClient - Construction
// ============================================================================

impl StompClient {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Spawns the event loop on the current tokio runtime.
    pub(crate) fn spawn(
        config: ConnectionConfig,
        options: ClientOptions,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::config("StompClient must be built inside a tokio runtime"))?;

        let registry = Arc::new(Mutex::new(SubscriptionRegistry::new()));
        let events = EventBus::new(options.event_capacity);

        let handle = EventLoop::spawn(
            config.clone(),
            options,
            connector,
            Arc::clone(&registry),
            events.clone(),
            &runtime,
        );

        debug!(endpoint = %config.endpoint_url, "Client created");

        Ok(Self {
            inner: Arc::new(ClientInner {
                config,
                handle,
                registry,
                events,
            }),
        })
    }
}

// ============================================================================
// StompClient - Lifecycle
// ============================================================================

impl StompClient {
    /// Starts connecting.
    ///
    /// No-op while already connecting or connected. From
    /// [`AwaitingReconnect`](ConnectionState::AwaitingReconnect) it skips
    /// the remaining delay.
    pub fn connect(&self) {
        self.inner.handle.command(LoopCommand::Connect);
    }

    /// Disconnects from any state and cancels pending reconnects.
    ///
    /// Subscriptions stay registered and are re-sent on the next
    /// [`connect`](Self::connect). Idempotent.
    pub fn disconnect(&self) {
        self.inner.handle.command(LoopCommand::Disconnect);
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        self.inner.handle.state()
    }

    /// Returns `true` if the handshake has completed.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Returns a receiver observing every state change.
    #[inline]
    #[must_use]
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.inner.handle.watch_state()
    }

    /// Waits until the client reaches `target`.
    ///
    /// Returns immediately if it is already there.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the event loop has exited.
    pub async fn wait_for_state(&self, target: ConnectionState) -> Result<()> {
        let mut rx = self.watch_state();
        rx.wait_for(|state| *state == target)
            .await
            .map(|_| ())
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Returns a receiver for lifecycle events emitted from now on.
    #[inline]
    #[must_use]
    pub fn events(&self) -> broadcast::Receiver<ClientEvent> {
        self.inner.events.subscribe()
    }

    /// Returns the connection configuration.
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ConnectionConfig {
        &self.inner.config
    }
}

// ============================================================================
// StompClient - Subscriptions
// ============================================================================

impl StompClient {
    /// Registers `handler` for messages on `destination`.
    ///
    /// Safe in any state. The SUBSCRIBE is sent now if connected and after
    /// every later handshake. The handler runs on the connection task with
    /// the decoded JSON body and must not block.
    pub fn subscribe<F>(&self, destination: impl Into<String>, handler: F) -> SubscriptionId
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let id = self.inner.registry.lock().add(destination, Arc::new(handler));
        self.inner.handle.command(LoopCommand::Subscribe(id));
        id
    }

    /// Removes a subscription. Unknown ids are ignored.
    ///
    /// Messages already in flight for `id` are dropped.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if self.inner.registry.lock().remove(id).is_some() {
            self.inner.handle.command(LoopCommand::Unsubscribe(id));
        } else {
            debug!(%id, "Unsubscribe for unknown id ignored");
        }
    }

    /// Returns the number of registered subscriptions.
    #[inline]
    #[must_use]
    pub fn subscription_count(&self) -> usize {
        self.inner.registry.lock().len()
    }
}

// ============================================================================
// StompClient - Sending
// ============================================================================

impl StompClient {
    /// Sends a raw body to `destination`.
    ///
    /// Dropped with a warning if not connected.
    pub fn send(&self, destination: &str, content_type: &str, body: impl Into<String>) {
        if !self.is_connected() {
            warn!(destination, "Not connected, send dropped");
            return;
        }

        let frame = Frame::new(Command::Send)
            .header(header::DESTINATION, destination)
            .header(header::CONTENT_TYPE, content_type)
            .body(body);
        self.inner.handle.command(LoopCommand::Send(frame));
    }

    /// Sends a JSON command. See [`CommandPublisher::send_command`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `params` is not a JSON object.
    pub fn send_command<P>(&self, destination: &str, command: &str, params: &P) -> Result<()>
    where
        P: Serialize + ?Sized,
    {
        self.publisher().send_command(destination, command, params)
    }

    /// Returns a publisher bound to this connection.
    #[inline]
    #[must_use]
    pub fn publisher(&self) -> CommandPublisher {
        CommandPublisher::new(self.inner.handle.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
