//! Connection event loop.
//!
//! One tokio task per client owns the transport and the
//! [`ConnectionState`]. It multiplexes:
//!
//! - Commands from the client handle (connect, subscribe, send, ...)
//! - The pending transport open
//! - Inbound payloads
//! - The reconnect timer
//! - The heartbeat timer
//!
//! Inbound frames are handled one at a time, and message handlers run
//! synchronously on this task in arrival order. Outbound frames are
//! written in the order the commands were issued.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::time::{Sleep, sleep, timeout};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ReceiptId, SubscriptionId};
use crate::protocol::{Command, Decoded, Frame, HEARTBEAT, decode, header};
use crate::subscription::{Subscription, SubscriptionRegistry};
use crate::transport::heartbeat::{format_heart_beat, outgoing_period};
use crate::transport::{Connector, HeartbeatMonitor, TextSink, TextStream, Transport};

use super::config::{ClientOptions, ConnectionConfig};
use super::events::{ClientEvent, EventBus, SessionInfo};
use super::state::ConnectionState;

// ============================================================================
// Constants
// ============================================================================

/// Upper bound on closing the sink during `disconnect()`.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

// ============================================================================
// Types
// ============================================================================

/// Transport open in flight.
type PendingOpen = BoxFuture<'static, Result<Transport>>;

// ============================================================================
// LoopCommand
// ============================================================================

/// Requests from client handles to the event loop.
#[derive(Debug)]
pub(crate) enum LoopCommand {
    /// Open a transport if idle or waiting to reconnect.
    Connect,
    /// Tear everything down.
    Disconnect,
    /// Emit SUBSCRIBE for a registered id if connected.
    Subscribe(SubscriptionId),
    /// Emit UNSUBSCRIBE for an id if it is live on the wire.
    Unsubscribe(SubscriptionId),
    /// Write a frame if connected, drop it otherwise.
    Send(Frame),
}

// ============================================================================
// LoopHandle
// ============================================================================

/// Cloneable sender side of the event loop.
#[derive(Debug, Clone)]
pub(crate) struct LoopHandle {
    /// Commands to the loop.
    command_tx: mpsc::UnboundedSender<LoopCommand>,
    /// Current state, published by the loop.
    state_rx: watch::Receiver<ConnectionState>,
}

impl LoopHandle {
    /// Queues a command. Silently ignored once the loop has exited.
    pub(crate) fn command(&self, command: LoopCommand) {
        if self.command_tx.send(command).is_err() {
            debug!("Event loop gone, command dropped");
        }
    }

    /// Returns the current state.
    #[inline]
    pub(crate) fn state(&self) -> ConnectionState {
        *self.state_rx.borrow()
    }

    /// Returns a new state receiver.
    #[inline]
    pub(crate) fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }
}

// ============================================================================
// Routing
// ============================================================================

/// What the loop must do after a payload was routed.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Routed {
    /// Nothing further.
    Handled,
    /// Handshake accepted.
    Handshake(SessionInfo),
    /// Broker reported a fault.
    BrokerError {
        /// `message` header.
        message: String,
        /// Frame body.
        details: String,
    },
}

/// Decodes and routes one inbound payload.
///
/// MESSAGE frames are delivered here, synchronously. Every drop path logs
/// exactly one diagnostic.
pub(crate) fn route_payload(
    text: &str,
    state: ConnectionState,
    registry: &Mutex<SubscriptionRegistry>,
) -> Routed {
    let frame = match decode(text) {
        Some(Decoded::Frame(frame)) => frame,
        Some(Decoded::Heartbeat) => {
            trace!("Heartbeat received");
            return Routed::Handled;
        }
        None => {
            warn!(len = text.len(), "Dropped malformed frame");
            return Routed::Handled;
        }
    };

    match (frame.kind(), state) {
        (Some(Command::Connected), ConnectionState::Connecting) => {
            Routed::Handshake(SessionInfo::from_frame(&frame))
        }

        (Some(Command::Message), ConnectionState::Connected) => {
            deliver(&frame, registry);
            Routed::Handled
        }

        (Some(Command::Error), _) => {
            let message = frame
                .get_header(header::MESSAGE)
                .unwrap_or("broker error")
                .to_string();
            warn!(%message, "Broker reported error");
            Routed::BrokerError {
                message,
                details: frame.body,
            }
        }

        (Some(Command::Receipt), _) => {
            debug!(receipt = ?frame.get_header(header::RECEIPT_ID), "Receipt received");
            Routed::Handled
        }

        (Some(command), _) if !command.is_server_frame() => {
            debug!(%command, "Dropped client-only frame sent by broker");
            Routed::Handled
        }

        (Some(command), state) => {
            debug!(%command, %state, "Dropped unexpected frame");
            Routed::Handled
        }

        (None, _) => {
            debug!(command = %frame.command, "Dropped frame with unknown command");
            Routed::Handled
        }
    }
}

/// Delivers a MESSAGE frame to its subscription handler.
///
/// The registry lock is released before the handler runs.
fn deliver(frame: &Frame, registry: &Mutex<SubscriptionRegistry>) {
    let Some(raw_id) = frame.get_header(header::SUBSCRIPTION) else {
        warn!("Dropped MESSAGE without subscription header");
        return;
    };

    let Some(id) = SubscriptionId::parse(raw_id) else {
        debug!(subscription = raw_id, "Dropped MESSAGE for unknown subscription");
        return;
    };

    let payload: Value = match serde_json::from_str(&frame.body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(subscription = raw_id, error = %e, "Dropped MESSAGE with invalid JSON body");
            return;
        }
    };

    if SubscriptionRegistry::dispatch(registry, id, payload) {
        trace!(%id, "Message delivered");
    } else {
        debug!(%id, "Dropped MESSAGE for unknown subscription");
    }
}

// ============================================================================
// EventLoop
// ============================================================================

/// Outcome of one `select!` round.
enum Step {
    Command(Option<LoopCommand>),
    Opened(Result<Transport>),
    Inbound(Option<Result<String>>),
    Reconnect,
    Heartbeat,
}

/// State owned by the connection task.
pub(crate) struct EventLoop {
    config: ConnectionConfig,
    options: ClientOptions,
    connector: Arc<dyn Connector>,
    registry: Arc<Mutex<SubscriptionRegistry>>,
    events: EventBus,
    state_tx: watch::Sender<ConnectionState>,
    command_rx: mpsc::UnboundedReceiver<LoopCommand>,

    state: ConnectionState,
    sink: Option<TextSink>,
    stream: Option<TextStream>,
    opening: Option<PendingOpen>,
    reconnect: Option<Pin<Box<Sleep>>>,
    heartbeat: HeartbeatMonitor,
    /// Ids with a SUBSCRIBE on the current transport.
    live: FxHashSet<SubscriptionId>,
}

impl EventLoop {
    /// Spawns the loop on the current runtime and returns its handle.
    pub(crate) fn spawn(
        config: ConnectionConfig,
        options: ClientOptions,
        connector: Arc<dyn Connector>,
        registry: Arc<Mutex<SubscriptionRegistry>>,
        events: EventBus,
        runtime: &tokio::runtime::Handle,
    ) -> LoopHandle {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

        let event_loop = Self {
            config,
            options,
            connector,
            registry,
            events,
            state_tx,
            command_rx,
            state: ConnectionState::Disconnected,
            sink: None,
            stream: None,
            opening: None,
            reconnect: None,
            heartbeat: HeartbeatMonitor::new(),
            live: FxHashSet::default(),
        };

        runtime.spawn(event_loop.run());

        LoopHandle {
            command_tx,
            state_rx,
        }
    }

    /// Runs until every handle is dropped.
    async fn run(mut self) {
        loop {
            let step = tokio::select! {
                command = self.command_rx.recv() => Step::Command(command),

                opened = poll_open(&mut self.opening), if self.opening.is_some() => {
                    Step::Opened(opened)
                }

                inbound = next_inbound(&mut self.stream), if self.stream.is_some() => {
                    Step::Inbound(inbound)
                }

                () = wait_timer(&mut self.reconnect), if self.reconnect.is_some() => {
                    Step::Reconnect
                }

                () = self.heartbeat.tick(), if self.heartbeat.is_running() => Step::Heartbeat,
            };

            match step {
                Step::Command(Some(command)) => self.handle_command(command).await,
                Step::Command(None) => {
                    debug!("All client handles dropped");
                    self.disconnect().await;
                    break;
                }
                Step::Opened(result) => {
                    self.opening = None;
                    self.handle_opened(result).await;
                }
                Step::Inbound(inbound) => self.handle_inbound(inbound).await,
                Step::Reconnect => {
                    self.reconnect = None;
                    if self.state == ConnectionState::AwaitingReconnect {
                        self.start_connect();
                    }
                }
                Step::Heartbeat => {
                    if let Err(e) = self.write_text(HEARTBEAT.to_string()).await {
                        self.transport_lost(&e);
                    }
                }
            }
        }

        debug!("Event loop terminated");
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn handle_command(&mut self, command: LoopCommand) {
        match command {
            LoopCommand::Connect => {
                if self.state.can_connect() {
                    self.start_connect();
                } else {
                    debug!(state = %self.state, "Connect ignored");
                }
            }

            LoopCommand::Disconnect => self.disconnect().await,

            LoopCommand::Subscribe(id) => {
                if !self.state.is_connected() || self.live.contains(&id) {
                    return;
                }
                let frame = self.registry.lock().get(id).map(Subscription::subscribe_frame);
                if let Some(frame) = frame {
                    self.write_subscribe(id, frame).await;
                }
            }

            LoopCommand::Unsubscribe(id) => {
                if self.live.remove(&id)
                    && self.state.is_connected()
                    && let Err(e) = self.write(Subscription::unsubscribe_frame(id)).await
                {
                    self.transport_lost(&e);
                }
            }

            LoopCommand::Send(frame) => {
                if !self.state.is_connected() {
                    warn!(
                        destination = ?frame.get_header(header::DESTINATION),
                        state = %self.state,
                        "Dropped send while not connected"
                    );
                    return;
                }
                if let Err(e) = self.write(frame).await {
                    self.transport_lost(&e);
                }
            }
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    fn start_connect(&mut self) {
        self.reconnect = None;

        let connector = Arc::clone(&self.connector);
        let endpoint = self.config.endpoint_url.clone();
        info!(%endpoint, "Connecting");

        self.opening = Some(Box::pin(async move { connector.connect(&endpoint).await }));
        self.set_state(ConnectionState::Connecting);
    }

    async fn handle_opened(&mut self, result: Result<Transport>) {
        let transport = match result {
            Ok(transport) => transport,
            Err(e) => {
                warn!(error = %e, "Transport open failed");
                self.transport_lost(&e);
                return;
            }
        };

        self.sink = Some(transport.sink);
        self.stream = Some(transport.stream);

        let frame = Frame::new(Command::Connect)
            .header(header::ACCEPT_VERSION, self.options.accept_version.as_str())
            .header(header::HOST, self.config.virtual_host.as_str())
            .header(header::LOGIN, self.config.login.as_str())
            .header(header::PASSCODE, self.config.passcode.as_str())
            .header(
                header::HEART_BEAT,
                format_heart_beat(self.options.heartbeat_outgoing, self.options.heartbeat_incoming),
            );

        debug!(host = %self.config.virtual_host, "Transport open, sending CONNECT");
        if let Err(e) = self.write(frame).await {
            self.transport_lost(&e);
        }
    }

    async fn handle_inbound(&mut self, inbound: Option<Result<String>>) {
        let text = match inbound {
            Some(Ok(text)) => text,
            Some(Err(e)) => {
                error!(error = %e, "Transport error");
                self.transport_lost(&e);
                return;
            }
            None => {
                debug!("Transport stream ended");
                self.transport_lost(&Error::ConnectionClosed);
                return;
            }
        };

        match route_payload(&text, self.state, &self.registry) {
            Routed::Handled => {}
            Routed::Handshake(info) => self.handle_handshake(info).await,
            Routed::BrokerError { message, details } => {
                self.events.emit(ClientEvent::BrokerError { message, details });
            }
        }
    }

    /// Resubscribes, then enters `Connected`.
    ///
    /// The state flips only after every SUBSCRIBE is written, so a write
    /// failure here is a failed connect, not a lost session.
    async fn handle_handshake(&mut self, info: SessionInfo) {
        let frames: Vec<(SubscriptionId, Frame)> = self
            .registry
            .lock()
            .all()
            .map(|s| (s.id, s.subscribe_frame()))
            .collect();

        for (id, frame) in frames {
            if !self.write_subscribe(id, frame).await {
                return;
            }
        }
        debug!(count = self.live.len(), "Subscriptions sent");

        self.set_state(ConnectionState::Connected);
        info!(
            version = ?info.version,
            server = ?info.server,
            "STOMP session established"
        );

        if let Some(period) =
            outgoing_period(self.options.heartbeat_outgoing, info.heart_beat.as_deref())
        {
            self.heartbeat.start(period);
        }

        self.events.emit(ClientEvent::Connected(info));
    }

    /// Handles transport loss or open failure and schedules the retry.
    ///
    /// Errors that would repeat on every attempt stop the loop in
    /// `Disconnected` instead.
    fn transport_lost(&mut self, cause: &Error) {
        let was_connected = self.state.is_connected();
        self.drop_transport();
        self.opening = None;

        if was_connected {
            info!(error = %cause, "Connection lost");
            self.events.emit(ClientEvent::Disconnected);
        } else {
            self.events.emit(ClientEvent::TransportError {
                message: cause.to_string(),
            });
        }

        if !cause.is_recoverable() {
            error!(error = %cause, "Connection cannot succeed, not retrying");
            self.reconnect = None;
            self.set_state(ConnectionState::Disconnected);
            return;
        }

        let delay = self.options.reconnect_delay;
        self.reconnect = Some(Box::pin(sleep(delay)));
        self.set_state(ConnectionState::AwaitingReconnect);
        info!(delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
    }

    async fn disconnect(&mut self) {
        let was_connected = self.state.is_connected();

        if was_connected {
            let frame = Frame::new(Command::Disconnect)
                .header(header::RECEIPT, ReceiptId::generate().to_string());
            if let Err(e) = self.write(frame).await {
                debug!(error = %e, "DISCONNECT not delivered");
            }
        }

        if let Some(mut sink) = self.sink.take()
            && let Err(e) = timeout(CLOSE_TIMEOUT, sink.close())
                .await
                .unwrap_or(Err(Error::ConnectionClosed))
        {
            debug!(error = %e, "Transport close failed");
        }

        self.opening = None;
        self.reconnect = None;
        self.drop_transport();

        if self.state != ConnectionState::Disconnected {
            info!("Disconnected");
        }
        if was_connected {
            self.events.emit(ClientEvent::Disconnected);
        }
        self.set_state(ConnectionState::Disconnected);
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Writes a SUBSCRIBE and marks the id live. Returns `false` if the
    /// transport was lost.
    async fn write_subscribe(&mut self, id: SubscriptionId, frame: Frame) -> bool {
        match self.write(frame).await {
            Ok(()) => {
                self.live.insert(id);
                true
            }
            Err(e) => {
                self.transport_lost(&e);
                false
            }
        }
    }

    async fn write(&mut self, frame: Frame) -> Result<()> {
        trace!(command = %frame.command, "Sending frame");
        self.write_text(frame.encode()).await
    }

    async fn write_text(&mut self, text: String) -> Result<()> {
        let sink = self.sink.as_mut().ok_or(Error::ConnectionClosed)?;
        sink.send(text).await
    }

    fn drop_transport(&mut self) {
        self.sink = None;
        self.stream = None;
        self.heartbeat.stop();
        self.live.clear();
    }

    fn set_state(&mut self, next: ConnectionState) {
        if self.state != next {
            debug!(from = %self.state, to = %next, "State changed");
            self.state = next;
            self.state_tx.send_replace(next);
        }
    }
}

// ============================================================================
// Select Helpers
// ============================================================================

async fn poll_open(opening: &mut Option<PendingOpen>) -> Result<Transport> {
    match opening.as_mut() {
        Some(open) => open.await,
        None => pending().await,
    }
}

async fn next_inbound(stream: &mut Option<TextStream>) -> Option<Result<String>> {
    match stream.as_mut() {
        Some(stream) => stream.next().await,
        None => pending().await,
    }
}

async fn wait_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer.as_mut() {
        Some(timer) => timer.as_mut().await,
        None => pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;
    use tracing::{Event, Level, Subscriber};
    use tracing_subscriber::layer::{Context, Layer, SubscriberExt};

    /// Counts WARN events.
    struct WarnCounter(Arc<AtomicUsize>);

    impl<S: Subscriber> Layer<S> for WarnCounter {
        fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() == Level::WARN {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    fn registry_with(dest: &str) -> (Mutex<SubscriptionRegistry>, SubscriptionId, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut registry = SubscriptionRegistry::new();
        let id = registry.add(dest, Arc::new(move |v| sink.lock().push(v)));
        (Mutex::new(registry), id, seen)
    }

    fn message(id: &str, body: &str) -> String {
        Frame::new(Command::Message)
            .header("subscription", id)
            .header("destination", "telemetry")
            .body(body)
            .encode()
    }

    #[test]
    fn test_route_message_to_handler() {
        let (registry, id, seen) = registry_with("telemetry");
        let routed = route_payload(
            &message(&id.to_string(), r#"{"battery":42}"#),
            ConnectionState::Connected,
            &registry,
        );

        assert_eq!(routed, Routed::Handled);
        assert_eq!(*seen.lock(), vec![json!({ "battery": 42 })]);
    }

    #[test]
    fn test_route_message_ignored_before_handshake() {
        let (registry, id, seen) = registry_with("telemetry");
        route_payload(&message(&id.to_string(), "{}"), ConnectionState::Connecting, &registry);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_route_unknown_subscription() {
        let (registry, _, seen) = registry_with("telemetry");
        route_payload(&message("sub-99", "{}"), ConnectionState::Connected, &registry);
        route_payload(&message("other", "{}"), ConnectionState::Connected, &registry);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_route_invalid_json_dropped() {
        let (registry, id, seen) = registry_with("telemetry");
        route_payload(&message(&id.to_string(), "not json"), ConnectionState::Connected, &registry);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_route_connected_only_while_connecting() {
        let (registry, _, _) = registry_with("telemetry");
        let connected = Frame::new(Command::Connected).header("version", "1.2").encode();

        let routed = route_payload(&connected, ConnectionState::Connecting, &registry);
        assert!(matches!(routed, Routed::Handshake(ref info) if info.version.as_deref() == Some("1.2")));

        let routed = route_payload(&connected, ConnectionState::Connected, &registry);
        assert_eq!(routed, Routed::Handled);
    }

    #[test]
    fn test_route_broker_error() {
        let (registry, _, _) = registry_with("telemetry");
        let error = Frame::new(Command::Error)
            .header("message", "access refused")
            .body("vhost not found")
            .encode();

        assert_eq!(
            route_payload(&error, ConnectionState::Connected, &registry),
            Routed::BrokerError {
                message: "access refused".into(),
                details: "vhost not found".into(),
            }
        );
    }

    #[test]
    fn test_route_client_frame_from_broker_dropped() {
        let (registry, _, seen) = registry_with("telemetry");
        let send = Frame::new(Command::Send).header("destination", "telemetry").body("{}").encode();
        assert_eq!(route_payload(&send, ConnectionState::Connected, &registry), Routed::Handled);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_route_heartbeat() {
        let (registry, _, seen) = registry_with("telemetry");
        assert_eq!(route_payload("\n", ConnectionState::Connected, &registry), Routed::Handled);
        assert!(seen.lock().is_empty());
    }

    #[test]
    fn test_malformed_payload_emits_one_warning() {
        let (registry, id, seen) = registry_with("telemetry");
        let warnings = Arc::new(AtomicUsize::new(0));
        let subscriber =
            tracing_subscriber::registry().with(WarnCounter(Arc::clone(&warnings)));

        tracing::subscriber::with_default(subscriber, || {
            let routed = route_payload("garbage\0", ConnectionState::Connected, &registry);
            assert_eq!(routed, Routed::Handled);
        });

        assert_eq!(warnings.load(Ordering::SeqCst), 1);
        assert_eq!(registry.lock().len(), 1);

        route_payload(&message(&id.to_string(), "{\"ok\":true}"), ConnectionState::Connected, &registry);
        assert_eq!(*seen.lock(), vec![json!({ "ok": true })]);
    }

    #[test]
    fn test_handler_may_reenter_registry() {
        let registry = Arc::new(Mutex::new(SubscriptionRegistry::new()));
        let inner = Arc::clone(&registry);
        let id = registry.lock().add(
            "telemetry",
            Arc::new(move |_: Value| {
                inner.lock().add("follow-up", Arc::new(|_: Value| {}));
            }),
        );

        route_payload(&message(&id.to_string(), "{}"), ConnectionState::Connected, &registry);
        assert_eq!(registry.lock().len(), 2);
    }
}
