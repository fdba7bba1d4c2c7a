//! Outbound command payload.
//!
//! # Format
//!
//! ```json
//! {
//!   "command": "RETURN_HOME",
//!   "params": { "altitude": 40 },
//!   "timestamp": "2026-10-14T09:30:00.000Z"
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Media type of serialized command payloads.
pub const JSON_CONTENT_TYPE: &str = "application/json";

// ============================================================================
// CommandPayload
// ============================================================================

/// Body of a control command published to a drone's command destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    /// Command name, opaque to the client.
    pub command: String,
    /// Command arguments.
    pub params: Map<String, Value>,
    /// Creation time, ISO-8601 UTC.
    pub timestamp: String,
}

impl CommandPayload {
    /// Creates a payload stamped with the current time.
    #[inline]
    #[must_use]
    pub fn new(command: impl Into<String>, params: Map<String, Value>) -> Self {
        Self::at(command, params, Utc::now())
    }

    /// Creates a payload stamped with a given time.
    #[must_use]
    pub fn at(command: impl Into<String>, params: Map<String, Value>, at: DateTime<Utc>) -> Self {
        Self {
            command: command.into(),
            params,
            timestamp: at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Converts any serializable value into command params.
    ///
    /// `null` becomes an empty map.
    ///
    /// # Errors
    ///
    /// - [`Error::Json`] if serialization fails
    /// - [`Error::InvalidArgument`] if the value is not a JSON object
    pub fn params_from<T: Serialize + ?Sized>(params: &T) -> Result<Map<String, Value>> {
        match serde_json::to_value(params)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            other => Err(Error::invalid_argument(format!(
                "command params must be a JSON object, got {other}"
            ))),
        }
    }

    /// Serializes the payload as a frame body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    #[inline]
    pub fn to_body(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_timestamp_format() {
        let at = Utc.with_ymd_and_hms(2026, 10, 14, 9, 30, 0).unwrap();
        let payload = CommandPayload::at("RETURN_HOME", Map::new(), at);
        assert_eq!(payload.timestamp, "2026-10-14T09:30:00.000Z");
    }

    #[test]
    fn test_body_schema() {
        let params = CommandPayload::params_from(&json!({ "altitude": 40 })).unwrap();
        let payload = CommandPayload::new("GOTO", params);
        let body: Value = serde_json::from_str(&payload.to_body().unwrap()).unwrap();

        assert_eq!(body["command"], "GOTO");
        assert_eq!(body["params"]["altitude"], 40);
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_params_null_is_empty() {
        let params = CommandPayload::params_from(&Value::Null).unwrap();
        assert!(params.is_empty());
    }

    #[test]
    fn test_params_must_be_object() {
        let err = CommandPayload::params_from(&json!([1, 2])).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }
}
