//! Registry synchronization pipeline
//!
//! Mirrors the hub's areas, devices, and entities into the local store for
//! target resolution. Each sync reports its own outcome; a failure in one
//! registry never blocks the others. The area/device/mapping syncs gate on a
//! live hub session as a readiness signal (the fetches themselves go over
//! REST); the entity-metadata sync is REST-only and ungated.

use crate::client::{RegistryKind, RegistrySource};
use crate::storage::{AreaRecord, DeviceRecord, EntityStateRecord, RegistryStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

const NOT_CONNECTED: &str = "Hub session not connected";

/// Outcome of an area sync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AreaSyncReport {
    pub created: u64,
    pub updated: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of a device sync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceSyncReport {
    pub created: u64,
    pub updated: u64,
    pub disabled: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of an entity→area mapping pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MappingSyncReport {
    pub updated: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Outcome of the entity-metadata sync
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitySyncReport {
    pub synced: u64,
    pub disabled: u64,
    pub errors: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate of the three registry syncs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncSummary {
    pub areas: AreaSyncReport,
    pub devices: DeviceSyncReport,
    pub mappings: MappingSyncReport,
}

/// Fetch the area registry and upsert it into the store
pub async fn sync_areas(
    source: &dyn RegistrySource,
    store: &RegistryStore,
    tenant: &str,
) -> AreaSyncReport {
    if !source.is_connected() {
        warn!("Hub session not connected, skipping area sync");
        return AreaSyncReport {
            error: Some(NOT_CONNECTED.to_string()),
            ..Default::default()
        };
    }

    let raw = match source.fetch_registry(RegistryKind::Areas).await {
        Ok(raw) => raw,
        Err(e) => {
            let error = format!("Error syncing areas: {e}");
            warn!("{error}");
            return AreaSyncReport {
                error: Some(error),
                ..Default::default()
            };
        }
    };
    if raw.is_empty() {
        warn!("No areas returned from hub");
        return AreaSyncReport::default();
    }

    let areas: Vec<AreaRecord> = raw.iter().filter_map(parse_area).collect();
    match store.upsert_areas(tenant, &areas).await {
        Ok((created, updated)) => {
            info!(created, updated, "Synced areas");
            AreaSyncReport {
                created,
                updated,
                error: None,
            }
        }
        Err(e) => {
            let error = format!("Error syncing areas: {e}");
            warn!("{error}");
            AreaSyncReport {
                error: Some(error),
                ..Default::default()
            }
        }
    }
}

/// Fetch the device registry and upsert it into the store
pub async fn sync_devices(
    source: &dyn RegistrySource,
    store: &RegistryStore,
    tenant: &str,
) -> DeviceSyncReport {
    if !source.is_connected() {
        warn!("Hub session not connected, skipping device sync");
        return DeviceSyncReport {
            error: Some(NOT_CONNECTED.to_string()),
            ..Default::default()
        };
    }

    let raw = match source.fetch_registry(RegistryKind::Devices).await {
        Ok(raw) => raw,
        Err(e) => {
            let error = format!("Error syncing devices: {e}");
            warn!("{error}");
            return DeviceSyncReport {
                error: Some(error),
                ..Default::default()
            };
        }
    };
    if raw.is_empty() {
        warn!("No devices returned from hub");
        return DeviceSyncReport::default();
    }

    let devices: Vec<DeviceRecord> = raw.iter().filter_map(parse_device).collect();
    match store.upsert_devices(tenant, &devices).await {
        Ok((created, updated, disabled)) => {
            info!(created, updated, disabled, "Synced devices");
            DeviceSyncReport {
                created,
                updated,
                disabled,
                error: None,
            }
        }
        Err(e) => {
            let error = format!("Error syncing devices: {e}");
            warn!("{error}");
            DeviceSyncReport {
                error: Some(error),
                ..Default::default()
            }
        }
    }
}

/// Derive entity area assignments through the device linkage.
///
/// For every upstream entity with a device, the device's stored area is
/// copied onto the entity. This is the only path that writes an entity's
/// `area_id`; an entity whose device is unknown to the store is left
/// untouched.
pub async fn sync_entity_area_mappings(
    source: &dyn RegistrySource,
    store: &RegistryStore,
    tenant: &str,
) -> MappingSyncReport {
    if !source.is_connected() {
        warn!("Hub session not connected, skipping entity area mapping");
        return MappingSyncReport {
            error: Some(NOT_CONNECTED.to_string()),
            ..Default::default()
        };
    }

    let raw = match source.fetch_registry(RegistryKind::Entities).await {
        Ok(raw) => raw,
        Err(e) => {
            let error = format!("Error syncing entity area mappings: {e}");
            warn!("{error}");
            return MappingSyncReport {
                error: Some(error),
                ..Default::default()
            };
        }
    };
    if raw.is_empty() {
        warn!("No entities returned from hub");
        return MappingSyncReport::default();
    }

    let mut updated = 0;
    for item in &raw {
        let (entity_id, device_id) = match (string_field(item, "entity_id"), string_field(item, "device_id")) {
            (Some(entity_id), Some(device_id)) => (entity_id, device_id),
            _ => continue,
        };

        let area_id = match store.device_area(tenant, &device_id).await {
            Ok(Some(area_id)) => area_id,
            // Unknown device: the entity keeps whatever area it had.
            Ok(None) => continue,
            Err(e) => {
                let error = format!("Error syncing entity area mappings: {e}");
                warn!("{error}");
                return MappingSyncReport {
                    updated,
                    error: Some(error),
                };
            }
        };

        match store
            .link_entity_area(tenant, &entity_id, &device_id, area_id.as_deref())
            .await
        {
            Ok(true) => updated += 1,
            Ok(false) => {}
            Err(e) => {
                let error = format!("Error syncing entity area mappings: {e}");
                warn!("{error}");
                return MappingSyncReport {
                    updated,
                    error: Some(error),
                };
            }
        }
    }

    info!(updated, "Updated entity area mappings");
    MappingSyncReport {
        updated,
        error: None,
    }
}

/// Run the three registry syncs in sequence, aggregating their reports.
///
/// Each sync fails independently; one registry's error never blocks the
/// siblings.
pub async fn sync_all(
    source: &dyn RegistrySource,
    store: &RegistryStore,
    tenant: &str,
) -> SyncSummary {
    info!("Starting hub registry sync");

    let summary = SyncSummary {
        areas: sync_areas(source, store, tenant).await,
        devices: sync_devices(source, store, tenant).await,
        mappings: sync_entity_area_mappings(source, store, tenant).await,
    };

    match serde_json::to_string(&summary) {
        Ok(json) => info!(summary = %json, "Hub registry sync complete"),
        Err(_) => info!("Hub registry sync complete"),
    }
    summary
}

/// Refresh entity metadata from the hub's flattened state list.
///
/// Distinct upsert path from the registry syncs: metadata columns
/// (`domain`, `friendly_name`, `device_class`, `last_seen`, `enabled`) are
/// overwritten while user-set aliases, rules, and notes are preserved.
/// Previously-enabled entities absent from the fetch are soft-disabled,
/// never deleted.
pub async fn sync_entities(
    source: &dyn RegistrySource,
    store: &RegistryStore,
    tenant: &str,
) -> EntitySyncReport {
    let states = match source.fetch_states().await {
        Ok(states) => states,
        Err(e) => {
            let error = format!("Error fetching entity states: {e}");
            warn!("{error}");
            return EntitySyncReport {
                error: Some(error),
                ..Default::default()
            };
        }
    };
    info!(count = states.len(), "Fetched entity states from hub");

    let entities: Vec<EntityStateRecord> = states.iter().filter_map(parse_entity_state).collect();

    let previously_enabled = match store.enabled_entity_ids(tenant).await {
        Ok(ids) => ids,
        Err(e) => {
            let error = format!("Error syncing entities: {e}");
            warn!("{error}");
            return EntitySyncReport {
                error: Some(error),
                ..Default::default()
            };
        }
    };

    let (synced, errors) = match store.upsert_entity_states(tenant, &entities).await {
        Ok(counts) => counts,
        Err(e) => {
            let error = format!("Error syncing entities: {e}");
            warn!("{error}");
            return EntitySyncReport {
                error: Some(error),
                ..Default::default()
            };
        }
    };

    let missing: Vec<String> = previously_enabled
        .iter()
        .filter(|id| !entities.iter().any(|e| &e.entity_id == *id))
        .cloned()
        .collect();

    let disabled = if missing.is_empty() {
        0
    } else {
        match store.disable_entities(tenant, &missing).await {
            Ok(count) => {
                info!(count, ?missing, "Marked missing entities as disabled");
                count
            }
            Err(e) => {
                let error = format!("Error disabling missing entities: {e}");
                warn!("{error}");
                return EntitySyncReport {
                    synced,
                    errors,
                    disabled: 0,
                    error: Some(error),
                };
            }
        }
    };

    info!(synced, disabled, errors, "Entity sync complete");
    EntitySyncReport {
        synced,
        disabled,
        errors,
        error: None,
    }
}

fn parse_area(item: &Value) -> Option<AreaRecord> {
    let area_id = string_field(item, "id")?;
    Some(AreaRecord {
        area_id,
        name: string_field(item, "name").unwrap_or_else(|| "Unknown".to_string()),
        icon: string_field(item, "icon"),
    })
}

fn parse_device(item: &Value) -> Option<DeviceRecord> {
    let device_id = string_field(item, "id")?;
    Some(DeviceRecord {
        device_id,
        name: string_field(item, "name").unwrap_or_else(|| "Unknown".to_string()),
        manufacturer: string_field(item, "manufacturer"),
        model: string_field(item, "model"),
        area_id: string_field(item, "area_id"),
    })
}

fn parse_entity_state(item: &Value) -> Option<EntityStateRecord> {
    let entity_id = string_field(item, "entity_id")?;
    let domain = entity_id.split('.').next().unwrap_or_default().to_string();
    let attributes = item.get("attributes");
    let attr = |key: &str| {
        attributes
            .and_then(|a| a.get(key))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    Some(EntityStateRecord {
        entity_id,
        domain,
        friendly_name: attr("friendly_name"),
        device_class: attr("device_class"),
    })
}

fn string_field(item: &Value, key: &str) -> Option<String> {
    item.get(key).and_then(Value::as_str).map(str::to_string)
}
