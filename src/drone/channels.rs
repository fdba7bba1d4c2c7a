//! Per-drone destinations.
//!
//! The backend fans each drone's traffic out on a topic exchange, one
//! routing key per category:
//!
//! ```text
//! /exchange/drone.gui/gui.<drone_id>.telemetry
//! /exchange/drone.gui/gui.<drone_id>.video
//! /exchange/drone.gui/gui.<drone_id>.detection
//! /exchange/drone.gui/gui.<drone_id>.alerts
//! /exchange/drone.gui/gui.<drone_id>.status
//! /exchange/drone.gui/gui.<drone_id>.commands   (outbound)
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Exchange prefix used by the conventional destinations.
pub const GUI_EXCHANGE: &str = "/exchange/drone.gui";

/// Routing-key suffix of the command destination.
const COMMANDS: &str = "commands";

// ============================================================================
// Category
// ============================================================================

/// Inbound message category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Position, attitude, battery.
    Telemetry,
    /// Camera frames.
    Video,
    /// Object detections.
    Detection,
    /// Operator alerts.
    Alerts,
    /// Flight status changes.
    Status,
}

impl Category {
    /// Every category, in subscription order.
    pub const ALL: [Self; 5] = [
        Self::Telemetry,
        Self::Video,
        Self::Detection,
        Self::Alerts,
        Self::Status,
    ];

    /// Returns the routing-key suffix.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Telemetry => "telemetry",
            Self::Video => "video",
            Self::Detection => "detection",
            Self::Alerts => "alerts",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// DroneTopics
// ============================================================================

/// Inbound destinations of one drone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DroneTopics {
    pub telemetry: String,
    pub video: String,
    pub detection: String,
    pub alerts: String,
    pub status: String,
}

impl DroneTopics {
    /// Conventional destinations for `drone_id`.
    #[must_use]
    pub fn for_drone(drone_id: &str) -> Self {
        let topic = |category: Category| routing(drone_id, category.as_str());
        Self {
            telemetry: topic(Category::Telemetry),
            video: topic(Category::Video),
            detection: topic(Category::Detection),
            alerts: topic(Category::Alerts),
            status: topic(Category::Status),
        }
    }

    /// Returns the destination of a category.
    #[must_use]
    pub fn get(&self, category: Category) -> &str {
        match category {
            Category::Telemetry => &self.telemetry,
            Category::Video => &self.video,
            Category::Detection => &self.detection,
            Category::Alerts => &self.alerts,
            Category::Status => &self.status,
        }
    }
}

// ============================================================================
// DroneChannels
// ============================================================================

/// All destinations of one drone, inbound and outbound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DroneChannels {
    /// Drone the destinations belong to.
    pub drone_id: String,
    /// Inbound topics.
    pub topics: DroneTopics,
    /// Where operator commands are sent.
    pub commands: String,
}

impl DroneChannels {
    /// Conventional destinations for `drone_id`.
    #[must_use]
    pub fn for_drone(drone_id: impl Into<String>) -> Self {
        let drone_id = drone_id.into();
        Self {
            topics: DroneTopics::for_drone(&drone_id),
            commands: routing(&drone_id, COMMANDS),
            drone_id,
        }
    }

    /// Returns the destination of a category.
    #[inline]
    #[must_use]
    pub fn destination(&self, category: Category) -> &str {
        self.topics.get(category)
    }
}

fn routing(drone_id: &str, suffix: &str) -> String {
    format!("{GUI_EXCHANGE}/gui.{drone_id}.{suffix}")
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_drone() {
        let channels = DroneChannels::for_drone("D-01");
        assert_eq!(
            channels.destination(Category::Telemetry),
            "/exchange/drone.gui/gui.D-01.telemetry"
        );
        assert_eq!(channels.destination(Category::Status), "/exchange/drone.gui/gui.D-01.status");
        assert_eq!(channels.commands, "/exchange/drone.gui/gui.D-01.commands");
    }

    #[test]
    fn test_every_category_distinct() {
        let channels = DroneChannels::for_drone("D-02");
        let mut destinations: Vec<_> =
            Category::ALL.iter().map(|c| channels.destination(*c)).collect();
        destinations.sort_unstable();
        destinations.dedup();
        assert_eq!(destinations.len(), Category::ALL.len());
    }

    #[test]
    fn test_category_serde() {
        let json = serde_json::to_string(&Category::Detection).unwrap();
        assert_eq!(json, "\"detection\"");
        let parsed: Category = serde_json::from_str("\"alerts\"").unwrap();
        assert_eq!(parsed, Category::Alerts);
    }
}
