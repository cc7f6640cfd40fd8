//! Wire frames for the hub's JSON control protocol
//!
//! Frames are tagged by a `type` field. The handshake runs
//! `auth_required` -> `auth` -> `auth_ok`/`auth_invalid`; afterwards
//! request/response pairs correlate on `id` and events route by
//! subscription id.

use crate::client::{ServiceData, ServiceTarget};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frames received from the hub
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Handshake opener; the hub expects an `auth` frame next
    AuthRequired,
    /// Token accepted
    AuthOk,
    /// Token rejected
    AuthInvalid {
        #[serde(default)]
        message: Option<String>,
    },
    /// Response to a correlated request
    Result(ResultFrame),
    /// Event for an active subscription
    Event(EventFrame),
}

/// `type=result` payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultFrame {
    /// Request id this result answers
    pub id: u64,

    /// Whether the hub accepted the request
    pub success: bool,

    /// Result payload, when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error object, when `success` is false
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

impl ResultFrame {
    /// Flatten the hub's error object into a printable string
    pub fn error_text(&self) -> Option<String> {
        self.error.as_ref().map(|e| match e {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }
}

/// `type=event` payload
#[derive(Debug, Clone, Deserialize)]
pub struct EventFrame {
    /// Subscription id this event belongs to
    pub id: u64,

    /// Event body
    #[serde(default)]
    pub event: Value,
}

/// Frames sent to the hub
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Handshake response carrying the bearer token
    Auth { access_token: String },
    /// Correlated service invocation
    CallService {
        id: u64,
        domain: String,
        service: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        target: Option<ServiceTarget>,
        #[serde(skip_serializing_if = "Option::is_none")]
        service_data: Option<ServiceData>,
    },
    /// Event subscription request
    SubscribeEvents {
        id: u64,
        #[serde(skip_serializing_if = "Option::is_none")]
        event_type: Option<String>,
    },
}

impl ClientFrame {
    /// Serialize to the wire encoding
    pub fn to_json(&self) -> String {
        // ClientFrame contains only JSON-representable fields
        serde_json::to_string(self).expect("client frame serialization cannot fail")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_handshake_frames() {
        let frame: ServerFrame =
            serde_json::from_str(r#"{"type":"auth_required","ha_version":"2026.1"}"#).unwrap();
        assert!(matches!(frame, ServerFrame::AuthRequired));

        let frame: ServerFrame =
            serde_json::from_str(r#"{"type":"auth_invalid","message":"bad token"}"#).unwrap();
        match frame {
            ServerFrame::AuthInvalid { message } => {
                assert_eq!(message.as_deref(), Some("bad token"))
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn parses_result_and_event_frames() {
        let frame: ServerFrame =
            serde_json::from_str(r#"{"id":7,"type":"result","success":true}"#).unwrap();
        match frame {
            ServerFrame::Result(result) => {
                assert_eq!(result.id, 7);
                assert!(result.success);
                assert!(result.error_text().is_none());
            }
            other => panic!("unexpected frame: {other:?}"),
        }

        let frame: ServerFrame = serde_json::from_str(
            r#"{"id":3,"type":"event","event":{"event_type":"state_changed"}}"#,
        )
        .unwrap();
        match frame {
            ServerFrame::Event(event) => {
                assert_eq!(event.id, 3);
                assert_eq!(event.event["event_type"], json!("state_changed"));
            }
            other => panic!("unexpected frame: {other:?}"),
        }
    }

    #[test]
    fn call_service_frame_wire_shape() {
        let frame = ClientFrame::CallService {
            id: 12,
            domain: "light".into(),
            service: "turn_on".into(),
            target: Some(crate::client::ServiceTarget::area("bedroom")),
            service_data: None,
        };
        let value: Value = serde_json::from_str(&frame.to_json()).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "call_service",
                "id": 12,
                "domain": "light",
                "service": "turn_on",
                "target": {"area_id": ["bedroom"]},
            })
        );
    }
}
