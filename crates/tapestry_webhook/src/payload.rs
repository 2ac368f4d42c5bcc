//! Notification body delivered to subscribers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tapestry_sync::EventKind;

/// JSON body POSTed to each subscriber endpoint.
///
/// The body is serialized once per notification; every subscriber and every
/// retry receives byte-identical content, so the signature stays valid
/// across attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationPayload {
    /// Dotted event name, e.g. `message.created`.
    pub event: String,
    /// When the notification was produced.
    pub timestamp: DateTime<Utc>,
    /// Server the change belongs to.
    pub server_id: String,
    /// Event-specific details.
    pub data: serde_json::Value,
}

impl NotificationPayload {
    /// Build a payload stamped with the current time.
    pub fn new(server_id: &str, event: EventKind, data: serde_json::Value) -> Self {
        Self {
            event: event.as_str().to_string(),
            timestamp: Utc::now(),
            server_id: server_id.to_string(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_camel_case() {
        let payload = NotificationPayload::new("S1", EventKind::MessageCreated, json!({"id": "M1"}));
        let value = serde_json::to_value(&payload).unwrap();
        assert_eq!(value["event"], "message.created");
        assert_eq!(value["serverId"], "S1");
        assert_eq!(value["data"]["id"], "M1");
        assert!(value["timestamp"].is_string());
    }
}
