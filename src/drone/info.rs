//! Backend connection-info document.
//!
//! Returned by the backend when a drone registers, and by its
//! `connection_info` lookup. Only the parts the dashboard needs are
//! modelled; unknown fields are ignored.
//!
//! ```json
//! {
//!   "drone_id": "D-01",
//!   "gui_token": "6f1c…",
//!   "stomp": { "url": "ws://host:15674/ws", "username": "guest",
//!              "password": "guest", "vhost": "/" },
//!   "gui_topics": { "telemetry": "…", "video": "…", "detection": "…",
//!                   "alerts": "…", "status": "…" },
//!   "gui_command_destination": "…"
//! }
//! ```
//!
//! The lookup variant has a bare `stomp_url` instead of the `stomp`
//! object.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::client::{ClientBuilder, ConnectionConfig, DEFAULT_VIRTUAL_HOST, StompClient};
use crate::error::{Error, Result};

use super::channels::{DroneChannels, DroneTopics};

// ============================================================================
// ConnectionInfo
// ============================================================================

/// Connection details for one drone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Drone identifier.
    pub drone_id: String,
    /// Opaque dashboard token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gui_token: Option<String>,
    /// Broker endpoint and credentials.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stomp: Option<ConnectionConfig>,
    /// Bare endpoint, when `stomp` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stomp_url: Option<String>,
    /// Inbound destinations. Derived from `drone_id` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gui_topics: Option<DroneTopics>,
    /// Outbound command destination. Derived from `drone_id` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gui_command_destination: Option<String>,
}

impl ConnectionInfo {
    /// Parses a connection-info document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the document is malformed.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Returns the drone's destinations, filling gaps with the
    /// conventional names.
    #[must_use]
    pub fn channels(&self) -> DroneChannels {
        let mut channels = DroneChannels::for_drone(self.drone_id.as_str());
        if let Some(topics) = &self.gui_topics {
            channels.topics = topics.clone();
        }
        if let Some(commands) = &self.gui_command_destination {
            channels.commands = commands.clone();
        }
        channels
    }

    /// Returns the broker configuration.
    ///
    /// A bare `stomp_url` is paired with `guest` credentials.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document names no endpoint.
    pub fn stomp_config(&self) -> Result<ConnectionConfig> {
        match (&self.stomp, &self.stomp_url) {
            (Some(config), _) => Ok(config.clone()),
            (None, Some(url)) => Ok(ConnectionConfig::new(
                url.as_str(),
                "guest",
                "guest",
                DEFAULT_VIRTUAL_HOST,
            )),
            (None, None) => Err(Error::config(format!(
                "Connection info for drone '{}' has no STOMP endpoint",
                self.drone_id
            ))),
        }
    }

    /// Returns a client builder preset with the broker configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the document names no endpoint.
    pub fn client_builder(&self) -> Result<ClientBuilder> {
        Ok(StompClient::builder().config(self.stomp_config()?))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::drone::Category;

    const REGISTRATION: &str = r#"{
        "drone_id": "D-01",
        "gui_token": "6f1c2a",
        "rabbitmq": { "host": "mq", "port": 5672 },
        "stomp": {
            "host": "mq",
            "port": 15674,
            "url": "ws://mq:15674/ws",
            "username": "operator",
            "password": "secret",
            "vhost": "/"
        },
        "topics": { "telemetry": "drone.D-01.telemetry" },
        "gui_topics": {
            "telemetry": "/exchange/drone.gui/gui.D-01.telemetry",
            "video": "/exchange/drone.gui/gui.D-01.video",
            "detection": "/exchange/drone.gui/gui.D-01.detection",
            "alerts": "/exchange/drone.gui/gui.D-01.alerts",
            "status": "/exchange/drone.gui/gui.D-01.status"
        },
        "gui_command_destination": "/exchange/drone.gui/gui.D-01.commands"
    }"#;

    #[test]
    fn test_registration_document() {
        let info = ConnectionInfo::from_json(REGISTRATION).unwrap();
        assert_eq!(info.drone_id, "D-01");

        let config = info.stomp_config().unwrap();
        assert_eq!(config.endpoint_url, "ws://mq:15674/ws");
        assert_eq!(config.login, "operator");

        let channels = info.channels();
        assert_eq!(channels, DroneChannels::for_drone("D-01"));
    }

    #[test]
    fn test_lookup_document() {
        let info = ConnectionInfo::from_json(
            r#"{ "drone_id": "D-07", "stomp_url": "ws://mq:15674/ws" }"#,
        )
        .unwrap();

        let config = info.stomp_config().unwrap();
        assert_eq!(config.endpoint_url, "ws://mq:15674/ws");
        assert_eq!(config.login, "guest");
        assert_eq!(
            info.channels().destination(Category::Video),
            "/exchange/drone.gui/gui.D-07.video"
        );
    }

    #[test]
    fn test_custom_destinations_win() {
        let info = ConnectionInfo::from_json(
            r#"{ "drone_id": "D-01", "gui_command_destination": "/queue/cmd" }"#,
        )
        .unwrap();
        assert_eq!(info.channels().commands, "/queue/cmd");
    }

    #[test]
    fn test_missing_endpoint() {
        let info = ConnectionInfo::from_json(r#"{ "drone_id": "D-01" }"#).unwrap();
        assert!(matches!(info.stomp_config(), Err(Error::Config { .. })));
        assert!(matches!(info.client_builder(), Err(Error::Config { .. })));
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(ConnectionInfo::from_json("{"), Err(Error::Json(_))));
    }
}
