//! Text-frame codec: raw UTF-8 frames to typed messages and back.

use serde_json::Value;
use thiserror::Error;

use crate::Message;

/// Failure to turn an inbound frame into a [`Message`].
///
/// Recoverable by design: the caller logs it, drops the frame, and keeps
/// the connection open.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed message: {0}")]
    Syntax(#[source] serde_json::Error),
    #[error("message has no `type` tag")]
    MissingKind,
}

/// Decode a raw text frame into a typed message.
///
/// Unknown `type` tags decode into [`Message::Unknown`] rather than
/// failing, so new agent message kinds never break older servers.
///
/// # Errors
/// Returns [`DecodeError::Syntax`] when the frame is not well-formed JSON
/// or a known kind carries malformed fields, and
/// [`DecodeError::MissingKind`] when no string `type` tag is present.
pub fn decode(raw: &str) -> Result<Message, DecodeError> {
    let value: Value = serde_json::from_str(raw).map_err(DecodeError::Syntax)?;
    if value.get("type").and_then(Value::as_str).is_none() {
        return Err(DecodeError::MissingKind);
    }
    serde_json::from_value(value).map_err(DecodeError::Syntax)
}

/// Encode a message as a text frame.
///
/// Total for messages built from this crate: every payload is JSON-native,
/// so serialization cannot fail.
#[must_use]
pub fn encode(msg: &Message) -> String {
    serde_json::to_string(msg).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_decode_register() {
        let raw = r#"{"type":"register","plugin_id":"p1","tab_id":1,"url":"http://x","title":"t","capabilities":["dom"]}"#;
        let Message::Register {
            plugin_id,
            tab_id,
            url,
            title,
            capabilities,
        } = decode(raw).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(plugin_id, "p1");
        assert_eq!(tab_id, Some(1));
        assert_eq!(url.as_deref(), Some("http://x"));
        assert_eq!(title.as_deref(), Some("t"));
        assert_eq!(capabilities, vec!["dom"]);
    }

    #[test]
    fn test_decode_bare_heartbeat() {
        let msg = decode(r#"{"type":"heartbeat"}"#).unwrap();
        assert!(matches!(
            msg,
            Message::Heartbeat {
                plugin_id: None,
                tab_id: None
            }
        ));
    }

    #[test]
    fn test_decode_result_with_data() {
        let raw = r#"{"type":"result","command_id":"c1","status":"success","data":{"k":1}}"#;
        let Message::Result {
            command_id,
            status,
            data,
            error,
        } = decode(raw).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(command_id, "c1");
        assert_eq!(status, "success");
        assert_eq!(data, Some(json!({"k": 1})));
        assert_eq!(error, None);
    }

    #[test]
    fn test_decode_error_report() {
        let Message::Error { message } = decode(r#"{"type":"error","error":"boom"}"#).unwrap()
        else {
            panic!("wrong variant");
        };
        assert_eq!(message, "boom");
    }

    #[test]
    fn test_decode_unknown_kind() {
        let msg = decode(r#"{"type":"telemetry","series":"cpu"}"#).unwrap();
        assert!(matches!(msg, Message::Unknown));
    }

    #[test]
    fn test_decode_rejects_non_json() {
        assert!(matches!(decode("not json"), Err(DecodeError::Syntax(_))));
    }

    #[test]
    fn test_decode_rejects_missing_kind() {
        assert!(matches!(
            decode(r#"{"plugin_id":"p1"}"#),
            Err(DecodeError::MissingKind)
        ));
        // A non-string tag is no tag at all.
        assert!(matches!(
            decode(r#"{"type":42}"#),
            Err(DecodeError::MissingKind)
        ));
    }

    #[test]
    fn test_decode_rejects_malformed_fields() {
        let raw = r#"{"type":"register","plugin_id":"p1","tab_id":"one"}"#;
        assert!(matches!(decode(raw), Err(DecodeError::Syntax(_))));
    }

    #[test]
    fn test_encode_register_ack() {
        let text = encode(&Message::register_ack("p1", 30));
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["type"], "register_ack");
        assert_eq!(value["plugin_id"], "p1");
        assert_eq!(value["heartbeat_interval"], 30);
        assert!(value["timestamp"].is_i64());
    }

    #[test]
    fn test_encode_command_roundtrip() {
        let cmd = Message::command("dom_capture", json!({"selector": "body"}));
        let Message::Command {
            command_id,
            action,
            payload,
            ..
        } = decode(&encode(&cmd)).unwrap()
        else {
            panic!("wrong variant");
        };
        assert!(!command_id.is_empty());
        assert_eq!(action, "dom_capture");
        assert_eq!(payload, json!({"selector": "body"}));
    }

    #[test]
    fn test_heartbeat_omits_absent_fields() {
        let text = encode(&Message::Heartbeat {
            plugin_id: None,
            tab_id: None,
        });
        assert_eq!(text, r#"{"type":"heartbeat"}"#);
    }
}
