//! Outbound keepalive.
//!
//! The client asks for `heart-beat: <outgoing>,<incoming>` in CONNECT and
//! the broker answers with its own pair in CONNECTED. While connected the
//! monitor ticks at the negotiated outgoing period and the event loop
//! writes a bare end-of-line on each tick.
//!
//! Inbound liveness is not checked here. A silent broker is only noticed
//! when the transport itself reports close or error.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, trace};

// ============================================================================
// Negotiation
// ============================================================================

/// Parses a `heart-beat` header value (`"cx,cy"`, milliseconds).
#[must_use]
pub fn parse_heart_beat(value: &str) -> Option<(u64, u64)> {
    let (x, y) = value.split_once(',')?;
    Some((x.trim().parse().ok()?, y.trim().parse().ok()?))
}

/// Formats a `heart-beat` header value.
#[must_use]
pub fn format_heart_beat(outgoing: Duration, incoming: Duration) -> String {
    format!("{},{}", outgoing.as_millis(), incoming.as_millis())
}

/// Negotiates one direction: disabled if either side says 0, else the
/// larger of the two.
#[inline]
#[must_use]
pub fn negotiate(client_ms: u64, server_ms: u64) -> Option<Duration> {
    if client_ms == 0 || server_ms == 0 {
        None
    } else {
        Some(Duration::from_millis(client_ms.max(server_ms)))
    }
}

/// Returns the period at which this client must send heartbeats.
///
/// Combines our outgoing wish with the incoming value from the broker's
/// `heart-beat` header. Without a usable header our own value is kept.
#[must_use]
pub fn outgoing_period(requested: Duration, server_header: Option<&str>) -> Option<Duration> {
    let ours = u64::try_from(requested.as_millis()).unwrap_or(u64::MAX);
    match server_header.and_then(parse_heart_beat) {
        Some((_, server_incoming)) => negotiate(ours, server_incoming),
        None if ours == 0 => None,
        None => Some(requested),
    }
}

// ============================================================================
// HeartbeatMonitor
// ============================================================================

/// Periodic timer driving outbound heartbeats.
#[derive(Debug, Default)]
pub struct HeartbeatMonitor {
    /// Running timer, `None` while stopped.
    interval: Option<Interval>,
}

impl HeartbeatMonitor {
    /// Creates a stopped monitor.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts ticking every `period`, first tick one period from now.
    ///
    /// Restarts the timer if already running.
    pub fn start(&mut self, period: Duration) {
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.interval = Some(interval);
        debug!(period_ms = period.as_millis() as u64, "Heartbeat started");
    }

    /// Stops the timer. No-op if stopped.
    pub fn stop(&mut self) {
        if self.interval.take().is_some() {
            debug!("Heartbeat stopped");
        }
    }

    /// Returns `true` while the timer runs.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.interval.is_some()
    }

    /// Returns the current period.
    #[inline]
    #[must_use]
    pub fn period(&self) -> Option<Duration> {
        self.interval.as_ref().map(Interval::period)
    }

    /// Waits for the next tick. Never resolves while stopped.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
                trace!("Heartbeat tick");
            }
            None => pending::<()>().await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
