//! Shared test fixtures: scoped stores and a scriptable registry source

#![allow(dead_code)]

use async_trait::async_trait;
use hublink::error::{HubError, Result};
use hublink::storage::{AreaRecord, DeviceRecord, EntityPatch, EntityStateRecord};
use hublink::{RegistryKind, RegistrySource, RegistryStore};
use serde_json::Value;
use tempfile::TempDir;

/// Open a store on a database file scoped to the test
pub async fn temp_store() -> (RegistryStore, TempDir) {
    let dir = tempfile::tempdir().expect("create temp dir");
    let path = dir.path().join("registry.db");
    let store = RegistryStore::open(path.to_str().unwrap())
        .await
        .expect("open registry store");
    (store, dir)
}

pub async fn seed_area(store: &RegistryStore, tenant: &str, area_id: &str, name: &str) {
    store
        .upsert_areas(
            tenant,
            &[AreaRecord {
                area_id: area_id.to_string(),
                name: name.to_string(),
                icon: None,
            }],
        )
        .await
        .expect("seed area");
}

pub async fn seed_device(
    store: &RegistryStore,
    tenant: &str,
    device_id: &str,
    name: &str,
    area_id: Option<&str>,
) {
    store
        .upsert_devices(
            tenant,
            &[DeviceRecord {
                device_id: device_id.to_string(),
                name: name.to_string(),
                manufacturer: None,
                model: None,
                area_id: area_id.map(str::to_string),
            }],
        )
        .await
        .expect("seed device");
}

pub async fn seed_entity(
    store: &RegistryStore,
    tenant: &str,
    entity_id: &str,
    domain: &str,
    friendly_name: Option<&str>,
) {
    store
        .upsert_entity_states(
            tenant,
            &[EntityStateRecord {
                entity_id: entity_id.to_string(),
                domain: domain.to_string(),
                friendly_name: friendly_name.map(str::to_string),
                device_class: None,
            }],
        )
        .await
        .expect("seed entity");
}

pub async fn set_aliases(store: &RegistryStore, tenant: &str, entity_id: &str, aliases: &[&str]) {
    let patch = EntityPatch {
        aliases: Some(aliases.iter().map(|a| a.to_string()).collect()),
        ..EntityPatch::default()
    };
    let found = store
        .update_entity(tenant, entity_id, &patch)
        .await
        .expect("set aliases");
    assert!(found, "entity {entity_id} should exist before aliasing");
}

/// Scriptable stand-in for the hub: fixed registry payloads, optional
/// connectivity and per-registry failure injection
#[derive(Debug, Clone, Default)]
pub struct MockRegistrySource {
    pub connected: bool,
    pub areas: Vec<Value>,
    pub devices: Vec<Value>,
    pub entities: Vec<Value>,
    pub states: Vec<Value>,
    pub fail_kind: Option<RegistryKind>,
}

impl MockRegistrySource {
    pub fn connected() -> Self {
        Self {
            connected: true,
            ..Self::default()
        }
    }
}

#[async_trait]
impl RegistrySource for MockRegistrySource {
    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn fetch_registry(&self, kind: RegistryKind) -> Result<Vec<Value>> {
        if self.fail_kind == Some(kind) {
            return Err(HubError::connection("mock registry failure"));
        }
        Ok(match kind {
            RegistryKind::Areas => self.areas.clone(),
            RegistryKind::Devices => self.devices.clone(),
            RegistryKind::Entities => self.entities.clone(),
        })
    }

    async fn fetch_states(&self) -> Result<Vec<Value>> {
        Ok(self.states.clone())
    }
}
