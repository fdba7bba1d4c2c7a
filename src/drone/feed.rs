//! Consuming side of one drone's channels.
//!
//! [`DroneFeed`] subscribes to every [`Category`] of a drone on an existing
//! client and tags each payload with its category. Dropping the feed
//! unsubscribes.
//!
//! # Example
//!
//! ```no_run
//! use dronecommand_telemetry::{DroneChannels, DroneFeed, StompClient};
//!
//! # async fn example() -> dronecommand_telemetry::Result<()> {
//! let client = StompClient::builder()
//!     .endpoint("ws://localhost:15674/ws")
//!     .build()?;
//!
//! let (feed, mut messages) = DroneFeed::attach(&client, DroneChannels::for_drone("D-01"));
//! client.connect();
//!
//! while let Some(message) = messages.recv().await {
//!     println!("{}: {}", message.category, message.payload);
//! }
//! # drop(feed);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, trace};

use crate::client::StompClient;
use crate::error::Result;
use crate::identifiers::SubscriptionId;

use super::channels::{Category, DroneChannels};

// ============================================================================
// FeedMessage
// ============================================================================

/// A payload received on one of a drone's topics.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedMessage {
    /// Topic category.
    pub category: Category,
    /// Decoded JSON body.
    pub payload: Value,
}

// ============================================================================
// DroneFeed
// ============================================================================

/// Subscriptions to all categories of one drone.
#[derive(Debug)]
pub struct DroneFeed {
    client: StompClient,
    channels: DroneChannels,
    subscriptions: Vec<(Category, SubscriptionId)>,
}

impl DroneFeed {
    /// Subscribes to every category and forwards payloads to a channel.
    ///
    /// The channel closes once the feed is dropped and in-flight messages
    /// have drained.
    #[must_use]
    pub fn attach(
        client: &StompClient,
        channels: DroneChannels,
    ) -> (Self, mpsc::UnboundedReceiver<FeedMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let feed = Self::attach_with(client, channels, move |category, payload| {
            if tx.send(FeedMessage { category, payload }).is_err() {
                trace!(%category, "Feed receiver dropped");
            }
        });
        (feed, rx)
    }

    /// Subscribes to every category with a shared callback.
    ///
    /// The callback runs on the connection task and must not block.
    #[must_use]
    pub fn attach_with<F>(client: &StompClient, channels: DroneChannels, handler: F) -> Self
    where
        F: Fn(Category, Value) + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);

        let subscriptions = Category::ALL
            .into_iter()
            .map(|category| {
                let handler = Arc::clone(&handler);
                let id = client.subscribe(channels.destination(category), move |payload| {
                    handler(category, payload);
                });
                (category, id)
            })
            .collect();

        debug!(drone_id = %channels.drone_id, "Drone feed attached");

        Self {
            client: client.clone(),
            channels,
            subscriptions,
        }
    }

    /// Sends an operator command to the drone.
    ///
    /// Dropped with a warning when the client is not connected.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`](crate::Error::InvalidArgument) if
    /// `params` is not a JSON object.
    pub fn send_command<P>(&self, command: &str, params: &P) -> Result<()>
    where
        P: Serialize + ?Sized,
    {
        self.client
            .send_command(&self.channels.commands, command, params)
    }

    /// Returns the subscription id of a category.
    #[must_use]
    pub fn subscription_id(&self, category: Category) -> Option<SubscriptionId> {
        self.subscriptions
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, id)| *id)
    }

    /// Returns the drone's destinations.
    #[inline]
    #[must_use]
    pub fn channels(&self) -> &DroneChannels {
        &self.channels
    }

    /// Returns the underlying client.
    #[inline]
    #[must_use]
    pub fn client(&self) -> &StompClient {
        &self.client
    }

    /// Unsubscribes every category.
    pub fn detach(self) {
        drop(self);
    }
}

impl Drop for DroneFeed {
    fn drop(&mut self) {
        for (_, id) in self.subscriptions.drain(..) {
            self.client.unsubscribe(id);
        }
        debug!(drone_id = %self.channels.drone_id, "Drone feed detached");
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::time::Duration;

    use serde_json::json;
    use tokio::time::timeout;

    use crate::client::ConnectionState;
    use crate::protocol::{Command, Frame};
    use crate::transport::ChannelConnector;

    const WAIT: Duration = Duration::from_secs(2);

    fn client(connector: ChannelConnector) -> StompClient {
        StompClient::builder()
            .endpoint("ws://broker.test/ws")
            .heartbeat(Duration::ZERO, Duration::ZERO)
            .reconnect_delay(Duration::from_millis(50))
            .connector(connector)
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_attach_subscribes_every_category() {
        let (connector, mut sessions) = ChannelConnector::new();
        let client = client(connector);
        let (feed, mut messages) = DroneFeed::attach(&client, DroneChannels::for_drone("D-01"));
        assert_eq!(client.subscription_count(), 5);

        client.connect();
        let mut broker = timeout(WAIT, sessions.recv()).await.unwrap().unwrap();
        broker.recv_frame().await.unwrap();
        broker.send_frame(&Frame::new(Command::Connected));

        let mut destinations = Vec::new();
        for _ in Category::ALL {
            let frame = timeout(WAIT, broker.recv_frame()).await.unwrap().unwrap();
            assert_eq!(frame.command, "SUBSCRIBE");
            destinations.push(frame.get_header("destination").unwrap().to_string());
        }
        assert_eq!(destinations[0], "/exchange/drone.gui/gui.D-01.telemetry");
        assert_eq!(destinations[4], "/exchange/drone.gui/gui.D-01.status");

        let alerts = feed.subscription_id(Category::Alerts).unwrap();
        broker.send_frame(
            &Frame::new(Command::Message)
                .header("subscription", alerts.to_string())
                .body(r#"{"level":"warning","message":"low battery"}"#),
        );

        let message = timeout(WAIT, messages.recv()).await.unwrap().unwrap();
        assert_eq!(message.category, Category::Alerts);
        assert_eq!(message.payload["message"], "low battery");
    }

    #[tokio::test]
    async fn test_send_command_targets_drone() {
        let (connector, mut sessions) = ChannelConnector::new();
        let client = client(connector);
        let feed = DroneFeed::attach_with(&client, DroneChannels::for_drone("D-09"), |_, _| {});

        client.connect();
        let mut broker = timeout(WAIT, sessions.recv()).await.unwrap().unwrap();
        broker.recv_frame().await.unwrap();
        broker.send_frame(&Frame::new(Command::Connected));
        client.wait_for_state(ConnectionState::Connected).await.unwrap();
        for _ in Category::ALL {
            broker.recv_frame().await.unwrap();
        }

        feed.send_command("return_home", &json!({ "reason": "operator" }))
            .unwrap();

        let send = timeout(WAIT, broker.recv_frame()).await.unwrap().unwrap();
        assert_eq!(send.command, "SEND");
        assert_eq!(
            send.get_header("destination"),
            Some("/exchange/drone.gui/gui.D-09.commands")
        );
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let (connector, _sessions) = ChannelConnector::new();
        let client = client(connector);

        let (feed, mut messages) = DroneFeed::attach(&client, DroneChannels::for_drone("D-01"));
        assert_eq!(client.subscription_count(), 5);

        feed.detach();
        assert_eq!(client.subscription_count(), 0);
        assert!(messages.recv().await.is_none());
    }
}
