//! Builder pattern for client configuration.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use dronecommand_telemetry::StompClient;
//!
//! # async fn example() -> dronecommand_telemetry::Result<()> {
//! let client = StompClient::builder()
//!     .endpoint("wss://broker.example.com/ws")
//!     .credentials("operator", "secret")
//!     .virtual_host("drones")
//!     .reconnect_delay(Duration::from_secs(2))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::transport::{Connector, WebSocketConnector};

use super::config::{ClientOptions, ConnectionConfig, DEFAULT_VIRTUAL_HOST};
use super::core::StompClient;

// ============================================================================
// Constants
// ============================================================================

/// Login and passcode used when none are set.
const DEFAULT_CREDENTIAL: &str = "guest";

// ============================================================================
// ClientBuilder
// ============================================================================

/// Builder for configuring a [`StompClient`].
///
/// Use [`StompClient::builder()`] to create a new builder.
#[derive(Clone)]
pub struct ClientBuilder {
    /// Broker endpoint URL.
    endpoint: Option<String>,
    /// CONNECT login.
    login: String,
    /// CONNECT passcode.
    passcode: String,
    /// CONNECT host header.
    virtual_host: String,
    /// Tunables.
    options: ClientOptions,
    /// Custom transport; WebSocket when unset.
    connector: Option<Arc<dyn Connector>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self {
            endpoint: None,
            login: DEFAULT_CREDENTIAL.to_string(),
            passcode: DEFAULT_CREDENTIAL.to_string(),
            virtual_host: DEFAULT_VIRTUAL_HOST.to_string(),
            options: ClientOptions::default(),
            connector: None,
        }
    }
}

impl fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("endpoint", &self.endpoint)
            .field("login", &self.login)
            .field("virtual_host", &self.virtual_host)
            .field("options", &self.options)
            .field("custom_connector", &self.connector.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ClientBuilder Implementation
// ============================================================================

impl ClientBuilder {
    /// Creates a builder with default credentials (`guest`/`guest`) and
    /// virtual host `/`.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the broker endpoint, e.g. `ws://localhost:15674/ws`.
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, url: impl Into<String>) -> Self {
        self.endpoint = Some(url.into());
        self
    }

    /// Sets the CONNECT login.
    #[inline]
    #[must_use]
    pub fn login(mut self, login: impl Into<String>) -> Self {
        self.login = login.into();
        self
    }

    /// Sets the CONNECT passcode.
    #[inline]
    #[must_use]
    pub fn passcode(mut self, passcode: impl Into<String>) -> Self {
        self.passcode = passcode.into();
        self
    }

    /// Sets login and passcode together.
    #[inline]
    #[must_use]
    pub fn credentials(self, login: impl Into<String>, passcode: impl Into<String>) -> Self {
        self.login(login).passcode(passcode)
    }

    /// Sets the virtual host sent as the `host` header.
    #[inline]
    #[must_use]
    pub fn virtual_host(mut self, vhost: impl Into<String>) -> Self {
        self.virtual_host = vhost.into();
        self
    }

    /// Takes endpoint, credentials and virtual host from a config.
    #[must_use]
    pub fn config(mut self, config: ConnectionConfig) -> Self {
        self.endpoint = Some(config.endpoint_url);
        self.login = config.login;
        self.passcode = config.passcode;
        self.virtual_host = config.virtual_host;
        self
    }

    /// Replaces all tunables.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Sets the fixed reconnect delay.
    #[inline]
    #[must_use]
    pub fn reconnect_delay(mut self, delay: Duration) -> Self {
        self.options = self.options.with_reconnect_delay(delay);
        self
    }

    /// Sets the requested heartbeat intervals. Zero disables a direction.
    #[inline]
    #[must_use]
    pub fn heartbeat(mut self, outgoing: Duration, incoming: Duration) -> Self {
        self.options = self.options.with_heartbeat(outgoing, incoming);
        self
    }

    /// Uses a custom transport instead of WebSocket.
    ///
    /// Any endpoint scheme is then accepted as long as it parses.
    #[inline]
    #[must_use]
    pub fn connector(mut self, connector: impl Connector) -> Self {
        self.connector = Some(Arc::new(connector));
        self
    }

    /// Builds the client and spawns its event loop. Does not connect.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the endpoint is missing or its scheme is
    ///   unsupported, if the options are invalid, or when called outside a
    ///   tokio runtime
    /// - [`Error::Url`] if the endpoint does not parse
    pub fn build(self) -> Result<StompClient> {
        let config = self.validate_config()?;
        self.options.validate()?;

        let connector: Arc<dyn Connector> = match self.connector {
            Some(connector) => connector,
            None => Arc::new(WebSocketConnector),
        };

        StompClient::spawn(config, self.options, connector)
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ClientBuilder {
    /// Validates the endpoint and assembles the connection config.
    fn validate_config(&self) -> Result<ConnectionConfig> {
        let endpoint = self.endpoint.clone().ok_or_else(|| {
            Error::config(
                "Endpoint URL is required. Use .endpoint() to set it.\n\
                 Example: StompClient::builder().endpoint(\"ws://localhost:15674/ws\")",
            )
        })?;

        let config = ConnectionConfig::new(
            endpoint,
            self.login.as_str(),
            self.passcode.as_str(),
            self.virtual_host.as_str(),
        );
        config.validate(self.connector.is_none())?;

        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================
