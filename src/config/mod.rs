//! Configuration for the hub client, registry store, and target resolver

use crate::error::{HubError, Result};
use serde::{Deserialize, Serialize};
use std::{env, time::Duration};
use url::Url;

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Hub connection configuration
    pub hub: HubConfig,

    /// Registry store configuration
    pub store: StoreConfig,

    /// Target resolver configuration
    #[serde(default)]
    pub resolver: ResolverConfig,
}

/// Hub connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Hub base URL (e.g., "http://192.168.1.50:8123")
    pub url: Url,

    /// Long-lived bearer token
    pub token: String,

    /// Tenant used when callers do not supply one
    #[serde(default = "default_tenant")]
    pub default_tenant: String,

    /// Timeout covering transport connect plus auth handshake
    #[serde(with = "humantime_serde", default = "default_connect_timeout")]
    pub connect_timeout: Duration,

    /// Per-request response wait (WebSocket) and REST client timeout
    #[serde(with = "humantime_serde", default = "default_request_timeout")]
    pub request_timeout: Duration,

    /// Reconnect attempts before entering cooldown
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Backoff cap for the exponential reconnect ladder
    #[serde(with = "humantime_serde", default = "default_reconnect_max_delay")]
    pub reconnect_max_delay: Duration,

    /// Pause between attempt rounds once the ceiling is hit
    #[serde(with = "humantime_serde", default = "default_reconnect_cooldown")]
    pub reconnect_cooldown: Duration,

    /// Ping interval while connected, backstopping drop detection
    #[serde(with = "humantime_serde", default = "default_keepalive_interval")]
    pub keepalive_interval: Duration,

    /// Enable the autonomous reconnect loop
    #[serde(default = "default_true")]
    pub auto_reconnect: bool,

    /// Bounded mailbox capacity per event subscription
    #[serde(default = "default_event_buffer")]
    pub event_buffer: usize,
}

/// Registry store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the local database file
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

/// Target resolver configuration
///
/// The thresholds are tunable rather than fixed: `match_threshold` is the
/// confidence a tier must reach to be accepted, and results below
/// `suggestion_threshold` are flagged for user confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Minimum confidence (0-100) for a tier to claim the match
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Confidence (0-100) below which a match is only a suggestion
    #[serde(default = "default_suggestion_threshold")]
    pub suggestion_threshold: f64,
}

fn default_tenant() -> String {
    "default".to_string()
}

fn default_connect_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_max_delay() -> Duration {
    Duration::from_secs(16)
}

fn default_reconnect_cooldown() -> Duration {
    Duration::from_secs(60)
}

fn default_keepalive_interval() -> Duration {
    Duration::from_secs(5)
}

fn default_true() -> bool {
    true
}

fn default_event_buffer() -> usize {
    64
}

fn default_database_path() -> String {
    "hublink.db".to_string()
}

fn default_match_threshold() -> f64 {
    70.0
}

fn default_suggestion_threshold() -> f64 {
    85.0
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            suggestion_threshold: default_suggestion_threshold(),
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

impl HubConfig {
    /// Build a hub configuration with defaults for everything but the endpoint
    pub fn new(url: Url, token: impl Into<String>) -> Self {
        Self {
            url,
            token: token.into(),
            default_tenant: default_tenant(),
            connect_timeout: default_connect_timeout(),
            request_timeout: default_request_timeout(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            reconnect_max_delay: default_reconnect_max_delay(),
            reconnect_cooldown: default_reconnect_cooldown(),
            keepalive_interval: default_keepalive_interval(),
            auto_reconnect: default_true(),
            event_buffer: default_event_buffer(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// Required: `HUB_URL`, `HUB_TOKEN`. Optional: `HUB_TENANT`,
    /// `HUB_DB_PATH`, `HUB_MATCH_THRESHOLD`, `HUB_SUGGESTION_THRESHOLD`.
    pub fn from_env() -> Result<Self> {
        let url = env::var("HUB_URL")
            .map_err(|_| HubError::config("HUB_URL not set"))?
            .parse::<Url>()
            .map_err(|e| HubError::config(format!("Invalid HUB_URL: {e}")))?;
        let token = env::var("HUB_TOKEN").map_err(|_| HubError::config("HUB_TOKEN not set"))?;

        let mut hub = HubConfig::new(url, token);
        if let Ok(tenant) = env::var("HUB_TENANT") {
            hub.default_tenant = tenant;
        }

        let mut store = StoreConfig::default();
        if let Ok(path) = env::var("HUB_DB_PATH") {
            store.database_path = path;
        }

        let mut resolver = ResolverConfig::default();
        if let Ok(raw) = env::var("HUB_MATCH_THRESHOLD") {
            resolver.match_threshold = raw
                .parse()
                .map_err(|e| HubError::config(format!("Invalid HUB_MATCH_THRESHOLD: {e}")))?;
        }
        if let Ok(raw) = env::var("HUB_SUGGESTION_THRESHOLD") {
            resolver.suggestion_threshold = raw
                .parse()
                .map_err(|e| HubError::config(format!("Invalid HUB_SUGGESTION_THRESHOLD: {e}")))?;
        }

        let config = Self {
            hub,
            store,
            resolver,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration consistency
    pub fn validate(&self) -> Result<()> {
        match self.hub.url.scheme() {
            "http" | "https" => {}
            other => {
                return Err(HubError::config(format!(
                    "Unsupported hub URL scheme: {other}"
                )))
            }
        }

        if self.hub.token.is_empty() {
            return Err(HubError::config("Hub token must not be empty"));
        }

        if self.hub.connect_timeout.is_zero() || self.hub.request_timeout.is_zero() {
            return Err(HubError::config("Timeouts must be non-zero"));
        }

        if self.hub.event_buffer == 0 {
            return Err(HubError::config("Event buffer capacity must be non-zero"));
        }

        let r = &self.resolver;
        if !(0.0..=100.0).contains(&r.match_threshold)
            || !(0.0..=100.0).contains(&r.suggestion_threshold)
        {
            return Err(HubError::config("Resolver thresholds must be within 0-100"));
        }
        if r.match_threshold > r.suggestion_threshold {
            return Err(HubError::config(
                "match_threshold must not exceed suggestion_threshold",
            ));
        }

        Ok(())
    }
}
