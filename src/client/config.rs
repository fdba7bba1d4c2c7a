//! Client configuration.
//!
//! [`ConnectionConfig`] says where and as whom to connect; it is fixed for
//! the lifetime of a client. [`ClientOptions`] holds the tunables.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use dronecommand_telemetry::{ClientOptions, ConnectionConfig};
//!
//! let config = ConnectionConfig::new("ws://localhost:15674/ws", "guest", "guest", "/");
//! let options = ClientOptions::new()
//!     .with_reconnect_delay(Duration::from_secs(2))
//!     .with_heartbeat(Duration::from_secs(5), Duration::from_secs(5));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default delay between a transport loss and the next attempt.
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Default heartbeat interval, both directions.
pub const DEFAULT_HEARTBEAT: Duration = Duration::from_secs(10);

/// Protocol versions offered in CONNECT.
pub const DEFAULT_ACCEPT_VERSION: &str = "1.2,1.1,1.0";

/// Default per-receiver event buffer.
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Default broker virtual host.
pub const DEFAULT_VIRTUAL_HOST: &str = "/";

// ============================================================================
// ConnectionConfig
// ============================================================================

/// Broker endpoint and credentials.
///
/// Deserializes from either field names or the backend's connection-info
/// names (`url`, `username`, `password`, `vhost`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Broker endpoint, e.g. `ws://localhost:15674/ws`.
    #[serde(alias = "url")]
    pub endpoint_url: String,
    /// Login sent in CONNECT.
    #[serde(alias = "username")]
    pub login: String,
    /// Passcode sent in CONNECT.
    #[serde(alias = "password")]
    pub passcode: String,
    /// Virtual host sent as the `host` header.
    #[serde(alias = "vhost", default = "default_virtual_host")]
    pub virtual_host: String,
}

fn default_virtual_host() -> String {
    DEFAULT_VIRTUAL_HOST.to_string()
}

impl ConnectionConfig {
    /// Creates a configuration.
    #[must_use]
    pub fn new(
        endpoint_url: impl Into<String>,
        login: impl Into<String>,
        passcode: impl Into<String>,
        virtual_host: impl Into<String>,
    ) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            login: login.into(),
            passcode: passcode.into(),
            virtual_host: virtual_host.into(),
        }
    }

    /// Validates the endpoint.
    ///
    /// With `websocket_only` the scheme must be `ws` or `wss`, and `wss`
    /// needs the `tls` feature.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the endpoint does not parse
    /// - [`Error::Config`] if the scheme is not supported
    pub fn validate(&self, websocket_only: bool) -> Result<Url> {
        let url = Url::parse(&self.endpoint_url)?;
        if websocket_only {
            match url.scheme() {
                "ws" => {}
                "wss" if cfg!(feature = "tls") => {}
                "wss" => {
                    return Err(Error::config(
                        "wss:// endpoint requires the `tls` feature",
                    ));
                }
                scheme => {
                    return Err(Error::config(format!(
                        "Unsupported endpoint scheme '{scheme}': expected ws:// or wss://"
                    )));
                }
            }
        }
        if self.virtual_host.is_empty() {
            return Err(Error::config("Virtual host must not be empty"));
        }
        Ok(url)
    }
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("endpoint_url", &self.endpoint_url)
            .field("login", &self.login)
            .field("passcode", &"<redacted>")
            .field("virtual_host", &self.virtual_host)
            .finish()
    }
}

// ============================================================================
// ClientOptions
// ============================================================================

/// Client tunables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    /// Fixed delay before each reconnect attempt.
    pub reconnect_delay: Duration,
    /// Interval at which we offer to send heartbeats (0 disables).
    pub heartbeat_outgoing: Duration,
    /// Interval at which we ask the broker to send heartbeats (0 disables).
    pub heartbeat_incoming: Duration,
    /// `accept-version` header value.
    pub accept_version: String,
    /// Events buffered per receiver before it lags.
    pub event_capacity: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientOptions {
    /// Creates options with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reconnect_delay: DEFAULT_RECONNECT_DELAY,
            heartbeat_outgoing: DEFAULT_HEARTBEAT,
            heartbeat_incoming: DEFAULT_HEARTBEAT,
            accept_version: DEFAULT_ACCEPT_VERSION.to_string(),
            event_capacity: DEFAULT_EVENT_CAPACITY,
        }
    }

    /// Sets the reconnect delay.
    #[inline]
    #[must_use]
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    /// Sets both heartbeat intervals.
    #[inline]
    #[must_use]
    pub fn with_heartbeat(mut self, outgoing: Duration, incoming: Duration) -> Self {
        self.heartbeat_outgoing = outgoing;
        self.heartbeat_incoming = incoming;
        self
    }

    /// Disables heartbeats in both directions.
    #[inline]
    #[must_use]
    pub fn without_heartbeat(self) -> Self {
        self.with_heartbeat(Duration::ZERO, Duration::ZERO)
    }

    /// Sets the `accept-version` header.
    #[inline]
    #[must_use]
    pub fn with_accept_version(mut self, versions: impl Into<String>) -> Self {
        self.accept_version = versions.into();
        self
    }

    /// Sets the per-receiver event buffer.
    #[inline]
    #[must_use]
    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity;
        self
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero reconnect delay or an empty
    /// version list.
    pub fn validate(&self) -> Result<()> {
        if self.reconnect_delay.is_zero() {
            return Err(Error::config("Reconnect delay must be greater than zero"));
        }
        if self.accept_version.trim().is_empty() {
            return Err(Error::config("accept-version must list at least one version"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
