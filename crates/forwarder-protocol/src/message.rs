//! Typed messages exchanged with connected agents.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A single frame on the wire, discriminated by its `type` tag.
///
/// Inbound kinds (`register`, `heartbeat`, `result`, `error`) are lenient:
/// everything except the tag may be absent. Outbound kinds are always built
/// through the constructors below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Registration handshake from an agent.
    Register {
        #[serde(default)]
        plugin_id: String,
        #[serde(default)]
        tab_id: Option<u32>,
        #[serde(default)]
        url: Option<String>,
        #[serde(default)]
        title: Option<String>,
        #[serde(default)]
        capabilities: Vec<String>,
    },
    /// Registration confirmation, echoing the agent's id and advertising
    /// the heartbeat interval in seconds.
    RegisterAck {
        plugin_id: String,
        heartbeat_interval: u64,
        timestamp: i64,
    },
    /// Liveness signal from an agent.
    Heartbeat {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        plugin_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tab_id: Option<u32>,
    },
    /// Liveness acknowledgement.
    HeartbeatAck { timestamp: i64 },
    /// Outcome reported by an agent for a previously issued command.
    Result {
        #[serde(default)]
        command_id: String,
        #[serde(default)]
        status: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        data: Option<Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    /// Server-issued instruction to an agent.
    Command {
        command_id: String,
        action: String,
        payload: Value,
        timestamp: i64,
    },
    /// Error report from an agent.
    Error {
        #[serde(default, alias = "error")]
        message: String,
    },
    /// Catch-all for kinds this server does not know about yet.
    #[serde(other)]
    Unknown,
}

impl Message {
    /// Build a `register_ack` reply stamped with the current time.
    #[must_use]
    pub fn register_ack(plugin_id: impl Into<String>, heartbeat_interval: u64) -> Self {
        Self::RegisterAck {
            plugin_id: plugin_id.into(),
            heartbeat_interval,
            timestamp: now_millis(),
        }
    }

    /// Build a `heartbeat_ack` reply stamped with the current time.
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self::HeartbeatAck {
            timestamp: now_millis(),
        }
    }

    /// Build a `command` with a freshly generated correlation id.
    #[must_use]
    pub fn command(action: impl Into<String>, payload: Value) -> Self {
        Self::Command {
            command_id: Uuid::new_v4().to_string(),
            action: action.into(),
            payload,
            timestamp: now_millis(),
        }
    }
}

/// Current time in milliseconds since the Unix epoch.
#[must_use]
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_register_ack_echoes_plugin_id() {
        let msg = Message::register_ack("p1", 30);
        let Message::RegisterAck {
            plugin_id,
            heartbeat_interval,
            timestamp,
        } = msg
        else {
            panic!("wrong variant");
        };
        assert_eq!(plugin_id, "p1");
        assert_eq!(heartbeat_interval, 30);
        assert!(timestamp > 0);
    }

    #[test]
    fn test_command_ids_are_unique() {
        let a = Message::command("dom_capture", json!({}));
        let b = Message::command("dom_capture", json!({}));
        let (Message::Command { command_id: id_a, .. }, Message::Command { command_id: id_b, .. }) =
            (a, b)
        else {
            panic!("wrong variant");
        };
        assert_ne!(id_a, id_b);
    }

    #[test]
    fn test_heartbeat_ack_timestamp_not_in_past() {
        let before = now_millis();
        let Message::HeartbeatAck { timestamp } = Message::heartbeat_ack() else {
            panic!("wrong variant");
        };
        assert!(timestamp >= before);
    }
}
