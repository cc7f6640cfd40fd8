//! REST client for the hub's HTTP API
//!
//! Serves two roles: the degraded fallback path for service calls when the
//! WebSocket session is down, and the bulk-read path for registries and the
//! flattened state list (bulk reads go over REST even while the session is
//! up, which has proven the more reliable channel for them).

use crate::client::{RegistryKind, ServiceCallResult, ServiceData, ServiceTarget};
use crate::config::HubConfig;
use crate::error::{HubError, Result};
use reqwest::{header, Client, ClientBuilder};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use url::Url;

/// HTTP client for the hub's REST API
#[derive(Debug, Clone)]
pub struct HubRestClient {
    client: Client,
    base_url: Url,
}

impl HubRestClient {
    /// Create a REST client with bearer auth baked into default headers
    pub fn new(config: &HubConfig) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", config.token))
            .map_err(|e| HubError::invalid_input(format!("Invalid authorization header: {e}")))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);

        let client = ClientBuilder::new()
            .timeout(config.request_timeout)
            .default_headers(headers)
            .user_agent(format!("hublink/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| HubError::connection(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
        })
    }

    /// Build URL for an API path
    fn build_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| HubError::connection(format!("Invalid URL path {path}: {e}")))
    }

    /// Call a service over REST.
    ///
    /// Only entity targeting survives this path: the endpoint has no notion
    /// of areas or devices, so such targets are logged as degraded and the
    /// call is submitted without them. Returns a structured result, never an
    /// error — transport failures become `success: false`.
    pub async fn call_service(
        &self,
        domain: &str,
        service: &str,
        target: Option<&ServiceTarget>,
        service_data: Option<&ServiceData>,
    ) -> ServiceCallResult {
        let mut payload = Map::new();

        if let Some(data) = service_data {
            payload.extend(data.clone().into_map());
        }

        match target {
            Some(ServiceTarget::Entity { entity_ids }) => {
                if !entity_ids.is_empty() {
                    // A single id goes up as a bare string, several as a list.
                    let value = if entity_ids.len() == 1 {
                        Value::String(entity_ids[0].clone())
                    } else {
                        Value::Array(entity_ids.iter().cloned().map(Value::String).collect())
                    };
                    payload.insert("entity_id".to_string(), value);
                }
            }
            Some(other) => {
                warn!(
                    ?other,
                    "REST fallback cannot target areas or devices; submitting without targeting"
                );
            }
            None => {}
        }

        let url = match self.build_url(&format!("api/services/{domain}/{service}")) {
            Ok(url) => url,
            Err(e) => return ServiceCallResult::failed(e.to_string()),
        };

        debug!(%url, domain, service, "Calling service via REST");
        match self.client.post(url).json(&Value::Object(payload)).send().await {
            Ok(response) if response.status().is_success() => ServiceCallResult::ok(),
            Ok(response) => ServiceCallResult::failed(format!("HTTP {}", response.status().as_u16())),
            Err(e) => ServiceCallResult::failed(e.to_string()),
        }
    }

    /// Fetch one of the hub's registries (`GET /api/config/{kind}`)
    pub async fn fetch_registry(&self, kind: RegistryKind) -> Result<Vec<Value>> {
        self.fetch_list(&format!("api/config/{}", kind.as_path()))
            .await
    }

    /// Fetch the flattened state list (`GET /api/states`)
    pub async fn fetch_states(&self) -> Result<Vec<Value>> {
        self.fetch_list("api/states").await
    }

    async fn fetch_list(&self, path: &str) -> Result<Vec<Value>> {
        let url = self.build_url(path)?;
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(HubError::connection(format!(
                "HTTP {} fetching {path}",
                status.as_u16()
            )));
        }

        let data: Value = response.json().await?;
        match data {
            Value::Array(items) => {
                debug!(path, count = items.len(), "Fetched list from hub");
                Ok(items)
            }
            other => Err(HubError::protocol(format!(
                "Expected a JSON array from {path}, got {}",
                type_name(&other)
            ))),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
