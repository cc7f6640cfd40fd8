//! Hub client stack for conversational smart-home control
//!
//! Three layers, leaf to root:
//!
//! - [`client`] — the protocol client: one authenticated WebSocket session
//!   per [`HubClient`] with request correlation, event dispatch, automatic
//!   reconnection, and a transparent REST fallback for service calls.
//! - [`sync`] — registry synchronization: mirrors the hub's areas, devices,
//!   and entities into a local [`storage::RegistryStore`].
//! - [`resolver`] — target resolution: turns a free-text phrase into a
//!   precise, confidence-scored control target over the mirrored registries.
//!
//! # Example
//!
//! ```rust,no_run
//! use hublink::{AppConfig, HubClient, RegistryStore, TargetResolver};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::from_env()?;
//!     let client = HubClient::new(config.hub.clone())?;
//!     client.connect().await;
//!
//!     let store = RegistryStore::open(&config.store.database_path).await?;
//!     hublink::sync::sync_all(&client, &store, &config.hub.default_tenant).await;
//!
//!     let resolver = TargetResolver::new(store, config.resolver.clone());
//!     let resolution = resolver
//!         .resolve("movie time", None, &config.hub.default_tenant)
//!         .await;
//!     if let Some(target) = resolution.target {
//!         client.call_service("scene", "turn_on", Some(target), None).await;
//!     }
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod storage;
pub mod sync;

// Re-export main types
pub use crate::{
    client::http_client::HubRestClient,
    client::websocket_client::{EventSubscription, HubClient},
    client::{
        ConnectionStatus, RegistryKind, RegistrySource, ServiceCallResult, ServiceData,
        ServiceTarget,
    },
    config::{AppConfig, HubConfig, ResolverConfig, StoreConfig},
    error::{HubError, Result},
    resolver::{Resolution, TargetResolver, TargetType},
    storage::RegistryStore,
};
