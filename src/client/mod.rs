//! Hub client implementations for WebSocket and REST communication

pub mod broker;
pub mod frames;
pub mod http_client;
pub mod websocket_client;

use crate::error::{HubError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Service call target, serialized exactly as the hub protocol expects:
/// `{"entity_id":[...]}`, `{"area_id":[...]}`, or `{"device_id":[...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServiceTarget {
    /// Concrete entity ids
    Entity {
        #[serde(rename = "entity_id")]
        entity_ids: Vec<String>,
    },
    /// Area ids, expanded hub-side over the live session
    Area {
        #[serde(rename = "area_id")]
        area_ids: Vec<String>,
    },
    /// Device ids, expanded hub-side over the live session
    Device {
        #[serde(rename = "device_id")]
        device_ids: Vec<String>,
    },
}

impl ServiceTarget {
    /// Target a single entity
    pub fn entity(id: impl Into<String>) -> Self {
        Self::Entity {
            entity_ids: vec![id.into()],
        }
    }

    /// Target a single area
    pub fn area(id: impl Into<String>) -> Self {
        Self::Area {
            area_ids: vec![id.into()],
        }
    }

    /// Target a single device
    pub fn device(id: impl Into<String>) -> Self {
        Self::Device {
            device_ids: vec![id.into()],
        }
    }

    /// Whether the REST fallback can carry this target faithfully
    pub fn is_entity(&self) -> bool {
        matches!(self, Self::Entity { .. })
    }
}

/// Keys that belong to the request frame itself and may not appear in
/// caller-supplied service data.
const RESERVED_DATA_KEYS: &[&str] = &["id", "type", "domain", "service", "target", "service_data"];

/// Validated key/value payload forwarded as the frame's `service_data`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ServiceData(Map<String, Value>);

impl ServiceData {
    /// Build service data from key/value pairs, rejecting empty or reserved keys
    pub fn new(pairs: impl IntoIterator<Item = (String, Value)>) -> Result<Self> {
        let mut map = Map::new();
        for (key, value) in pairs {
            if key.is_empty() {
                return Err(HubError::invalid_input("Service data key must not be empty"));
            }
            if RESERVED_DATA_KEYS.contains(&key.as_str()) {
                return Err(HubError::invalid_input(format!(
                    "Service data key '{key}' collides with a frame field"
                )));
            }
            map.insert(key, value);
        }
        Ok(Self(map))
    }

    /// Whether any values are present
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate the underlying pairs
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub(crate) fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

/// Outcome of a service call, over either transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceCallResult {
    /// Whether the hub accepted the call
    pub success: bool,

    /// Result payload from the hub, when present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error description when `success` is false
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceCallResult {
    /// Successful call with no payload
    pub fn ok() -> Self {
        Self {
            success: true,
            result: None,
            error: None,
        }
    }

    /// Failed call with an error description
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }

    /// Failed call from a response-wait timeout
    pub fn timed_out() -> Self {
        Self::failed("timeout")
    }
}

/// Read-only snapshot of the session state
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectionStatus {
    /// Whether the session is authenticated and live
    pub connected: bool,

    /// Most recent connection or auth failure
    pub last_error: Option<String>,

    /// Reconnect attempts since the last successful connection
    pub reconnect_attempts: u32,

    /// Attempt ceiling before the cooldown kicks in
    pub max_reconnect_attempts: u32,

    /// When the session last authenticated successfully
    pub last_connection_time: Option<chrono::DateTime<chrono::Utc>>,
}

/// The hub's three mirrored catalogs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    /// Area registry
    Areas,
    /// Device registry
    Devices,
    /// Entity registry
    Entities,
}

impl RegistryKind {
    /// Registry path segment under `/api/config/`
    pub fn as_path(&self) -> &'static str {
        match self {
            Self::Areas => "area_registry/list",
            Self::Devices => "device_registry/list",
            Self::Entities => "entity_registry/list",
        }
    }
}

/// Source of registry and state data for the sync pipeline
///
/// Implemented by [`websocket_client::HubClient`]; test doubles stand in for
/// the hub without a network.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    /// Whether the live session is up (sync readiness gate)
    fn is_connected(&self) -> bool;

    /// Fetch one of the hub's registries
    async fn fetch_registry(&self, kind: RegistryKind) -> Result<Vec<Value>>;

    /// Fetch the flattened state list for entity metadata
    async fn fetch_states(&self) -> Result<Vec<Value>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn target_serializes_to_wire_shape() {
        let target = ServiceTarget::area("bedroom");
        assert_eq!(
            serde_json::to_value(&target).unwrap(),
            json!({"area_id": ["bedroom"]})
        );

        let target = ServiceTarget::Entity {
            entity_ids: vec!["light.desk".into(), "light.shelf".into()],
        };
        assert_eq!(
            serde_json::to_value(&target).unwrap(),
            json!({"entity_id": ["light.desk", "light.shelf"]})
        );
    }

    #[test]
    fn target_deserializes_by_key() {
        let target: ServiceTarget =
            serde_json::from_value(json!({"device_id": ["abc123"]})).unwrap();
        assert_eq!(target, ServiceTarget::device("abc123"));
    }

    #[test]
    fn service_data_rejects_reserved_keys() {
        let err = ServiceData::new([("domain".to_string(), json!("light"))]);
        assert!(err.is_err());

        let ok = ServiceData::new([("brightness".to_string(), json!(100))]).unwrap();
        assert!(!ok.is_empty());
    }
}
