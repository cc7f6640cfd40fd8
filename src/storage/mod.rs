//! Local registry mirror backed by libsql
//!
//! Holds the relational mirror of the hub's three catalogs (areas, devices,
//! entities) that registry sync keeps current and the target resolver reads.
//! Rows are never deleted: upstream disappearance soft-disables, so
//! user-set aliases, rules, and notes survive. Every logical operation
//! acquires its own connection and releases it on return.

use crate::error::{HubError, Result};
use libsql::{params, Builder, Connection, Database, Value as DbValue};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Area row as reported by the hub's area registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AreaRecord {
    pub area_id: String,
    pub name: String,
    pub icon: Option<String>,
}

/// Device row as reported by the hub's device registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceRecord {
    pub device_id: String,
    pub name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub area_id: Option<String>,
}

/// Entity metadata as reported by the hub's flattened state list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStateRecord {
    pub entity_id: String,
    pub domain: String,
    pub friendly_name: Option<String>,
    pub device_class: Option<String>,
}

/// Candidate row for the name-matching tiers
#[derive(Debug, Clone)]
pub struct NamedRow {
    pub id: String,
    pub name: String,
    pub aliases: Vec<String>,
}

/// Candidate row for the entity fallback tier
#[derive(Debug, Clone)]
pub struct EntityCandidate {
    pub entity_id: String,
    pub domain: String,
    pub friendly_name: Option<String>,
    pub aliases: Vec<String>,
}

/// Full entity row for the customization surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRow {
    pub entity_id: String,
    pub domain: String,
    pub friendly_name: Option<String>,
    pub area_id: Option<String>,
    pub device_id: Option<String>,
    pub device_class: Option<String>,
    pub aliases: Vec<String>,
    pub enabled: bool,
    pub rules: Value,
    pub notes: Option<String>,
    pub last_seen: Option<String>,
}

/// User-editable entity fields; `None` leaves a field untouched
#[derive(Debug, Clone, Default)]
pub struct EntityPatch {
    pub aliases: Option<Vec<String>>,
    pub enabled: Option<bool>,
    pub rules: Option<Value>,
    pub notes: Option<String>,
}

impl EntityPatch {
    fn is_empty(&self) -> bool {
        self.aliases.is_none()
            && self.enabled.is_none()
            && self.rules.is_none()
            && self.notes.is_none()
    }
}

/// Registry mirror with per-operation scoped connections
#[derive(Clone)]
pub struct RegistryStore {
    db: Arc<Database>,
}

impl RegistryStore {
    /// Open (or create) the local database and ensure the schema exists
    pub async fn open(path: &str) -> Result<Self> {
        info!(path, "Opening registry store");
        let db = Builder::new_local(path).build().await?;
        let store = Self { db: Arc::new(db) };
        store.init_schema().await?;
        Ok(store)
    }

    fn connection(&self) -> Result<Connection> {
        self.db.connect().map_err(HubError::from)
    }

    async fn init_schema(&self) -> Result<()> {
        let conn = self.connection()?;

        let statements = [
            r#"
            CREATE TABLE IF NOT EXISTS areas (
                tenant TEXT NOT NULL,
                area_id TEXT NOT NULL,
                name TEXT NOT NULL,
                icon TEXT,
                aliases TEXT NOT NULL DEFAULT '[]',
                last_synced TEXT,
                PRIMARY KEY (tenant, area_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS devices (
                tenant TEXT NOT NULL,
                device_id TEXT NOT NULL,
                name TEXT NOT NULL,
                manufacturer TEXT,
                model TEXT,
                area_id TEXT,
                aliases TEXT NOT NULL DEFAULT '[]',
                enabled INTEGER NOT NULL DEFAULT 1,
                last_synced TEXT,
                PRIMARY KEY (tenant, device_id)
            )
            "#,
            r#"
            CREATE TABLE IF NOT EXISTS entities (
                tenant TEXT NOT NULL,
                entity_id TEXT NOT NULL,
                domain TEXT NOT NULL,
                friendly_name TEXT,
                area_id TEXT,
                device_id TEXT,
                device_class TEXT,
                aliases TEXT NOT NULL DEFAULT '[]',
                enabled INTEGER NOT NULL DEFAULT 1,
                rules TEXT NOT NULL DEFAULT '{}',
                notes TEXT,
                last_seen TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (tenant, entity_id)
            )
            "#,
            "CREATE INDEX IF NOT EXISTS idx_entities_domain ON entities (tenant, domain, enabled)",
            "CREATE INDEX IF NOT EXISTS idx_entities_device ON entities (tenant, device_id)",
            "CREATE INDEX IF NOT EXISTS idx_devices_area ON devices (tenant, area_id)",
        ];

        for sql in statements {
            conn.execute(sql, ()).await?;
        }

        debug!("Registry store schema ready");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Sync upserts
    // ------------------------------------------------------------------

    /// Upsert areas by primary key; returns `(created, updated)`
    pub async fn upsert_areas(&self, tenant: &str, areas: &[AreaRecord]) -> Result<(u64, u64)> {
        let conn = self.connection()?;
        let existing = self.ids(&conn, "SELECT area_id FROM areas WHERE tenant = ?1", tenant).await?;
        let now = now_rfc3339();

        let mut created = 0;
        let mut updated = 0;
        for area in areas {
            conn.execute(
                r#"
                INSERT INTO areas (tenant, area_id, name, icon, last_synced)
                VALUES (?1, ?2, ?3, ?4, ?5)
                ON CONFLICT (tenant, area_id) DO UPDATE SET
                    name = excluded.name,
                    icon = excluded.icon,
                    last_synced = excluded.last_synced
                "#,
                params![tenant, area.area_id.as_str(), area.name.as_str(), opt_text(&area.icon), now.as_str()],
            )
            .await?;

            if existing.contains(&area.area_id) {
                updated += 1;
            } else {
                created += 1;
            }
        }

        Ok((created, updated))
    }

    /// Upsert devices by primary key, soft-disabling devices the hub no
    /// longer reports; returns `(created, updated, disabled)`
    pub async fn upsert_devices(
        &self,
        tenant: &str,
        devices: &[DeviceRecord],
    ) -> Result<(u64, u64, u64)> {
        let conn = self.connection()?;
        let existing = self
            .ids(&conn, "SELECT device_id FROM devices WHERE tenant = ?1", tenant)
            .await?;
        let now = now_rfc3339();

        let mut created = 0;
        let mut updated = 0;
        let mut seen = HashSet::new();
        for device in devices {
            conn.execute(
                r#"
                INSERT INTO devices (tenant, device_id, name, manufacturer, model, area_id, enabled, last_synced)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7)
                ON CONFLICT (tenant, device_id) DO UPDATE SET
                    name = excluded.name,
                    manufacturer = excluded.manufacturer,
                    model = excluded.model,
                    area_id = excluded.area_id,
                    enabled = 1,
                    last_synced = excluded.last_synced
                "#,
                params![
                    tenant,
                    device.device_id.as_str(),
                    device.name.as_str(),
                    opt_text(&device.manufacturer),
                    opt_text(&device.model),
                    opt_text(&device.area_id),
                    now.as_str()
                ],
            )
            .await?;

            seen.insert(device.device_id.clone());
            if existing.contains(&device.device_id) {
                updated += 1;
            } else {
                created += 1;
            }
        }

        let mut disabled = 0;
        for missing in existing.difference(&seen) {
            disabled += conn
                .execute(
                    "UPDATE devices SET enabled = 0 WHERE tenant = ?1 AND device_id = ?2 AND enabled = 1",
                    params![tenant, missing.as_str()],
                )
                .await?;
        }

        Ok((created, updated, disabled))
    }

    /// Area of a device, if the device row exists.
    ///
    /// `Ok(None)` means the device is unknown; `Ok(Some(None))` means the
    /// device exists without an area assignment.
    pub async fn device_area(&self, tenant: &str, device_id: &str) -> Result<Option<Option<String>>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT area_id FROM devices WHERE tenant = ?1 AND device_id = ?2",
                params![tenant, device_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(text_or_null(row.get_value(0)?))),
            None => Ok(None),
        }
    }

    /// Record an entity's device linkage and the area derived from it;
    /// returns whether a row was touched
    pub async fn link_entity_area(
        &self,
        tenant: &str,
        entity_id: &str,
        device_id: &str,
        area_id: Option<&str>,
    ) -> Result<bool> {
        let conn = self.connection()?;
        let changed = conn
            .execute(
                r#"
                UPDATE entities
                SET area_id = ?1, device_id = ?2, updated_at = ?3
                WHERE tenant = ?4 AND entity_id = ?5
                "#,
                params![
                    area_id.map(str::to_string).map(DbValue::Text).unwrap_or(DbValue::Null),
                    device_id,
                    now_rfc3339().as_str(),
                    tenant,
                    entity_id
                ],
            )
            .await?;
        Ok(changed > 0)
    }

    /// Entity ids currently enabled for a tenant
    pub async fn enabled_entity_ids(&self, tenant: &str) -> Result<HashSet<String>> {
        let conn = self.connection()?;
        self.ids(
            &conn,
            "SELECT entity_id FROM entities WHERE tenant = ?1 AND enabled = 1",
            tenant,
        )
        .await
    }

    /// Upsert entity metadata from the flattened state list.
    ///
    /// Only metadata columns are overwritten on conflict; user-set aliases,
    /// rules, and notes are preserved, and `area_id` stays whatever the
    /// device linkage last derived. Returns `(synced, errors)`.
    pub async fn upsert_entity_states(
        &self,
        tenant: &str,
        entities: &[EntityStateRecord],
    ) -> Result<(u64, u64)> {
        let conn = self.connection()?;
        let now = now_rfc3339();

        let mut synced = 0;
        let mut errors = 0;
        for entity in entities {
            let outcome = conn
                .execute(
                    r#"
                    INSERT INTO entities
                        (tenant, entity_id, domain, friendly_name, device_class,
                         last_seen, enabled, created_at, updated_at)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, 1, ?7, ?7)
                    ON CONFLICT (tenant, entity_id) DO UPDATE SET
                        domain = excluded.domain,
                        friendly_name = excluded.friendly_name,
                        device_class = excluded.device_class,
                        last_seen = excluded.last_seen,
                        enabled = 1,
                        updated_at = excluded.updated_at
                    "#,
                    params![
                        tenant,
                        entity.entity_id.as_str(),
                        entity.domain.as_str(),
                        opt_text(&entity.friendly_name),
                        opt_text(&entity.device_class),
                        now.as_str(),
                        now.as_str()
                    ],
                )
                .await;

            match outcome {
                Ok(_) => synced += 1,
                Err(e) => {
                    warn!(entity_id = %entity.entity_id, error = %e, "Failed to sync entity");
                    errors += 1;
                }
            }
        }

        Ok((synced, errors))
    }

    /// Soft-disable entities the hub no longer reports; returns the count
    pub async fn disable_entities(&self, tenant: &str, entity_ids: &[String]) -> Result<u64> {
        let conn = self.connection()?;
        let now = now_rfc3339();

        let mut disabled = 0;
        for entity_id in entity_ids {
            disabled += conn
                .execute(
                    "UPDATE entities SET enabled = 0, updated_at = ?1 WHERE tenant = ?2 AND entity_id = ?3",
                    params![now.as_str(), tenant, entity_id.as_str()],
                )
                .await?;
        }
        Ok(disabled)
    }

    // ------------------------------------------------------------------
    // Resolver candidate queries
    // ------------------------------------------------------------------

    /// Enabled scene exactly matching the normalized query
    pub async fn scene_exact(&self, tenant: &str, query: &str) -> Result<Option<(String, String)>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                r#"
                SELECT entity_id, friendly_name FROM entities
                WHERE tenant = ?1 AND domain = 'scene' AND enabled = 1
                    AND LOWER(friendly_name) = ?2
                LIMIT 1
                "#,
                params![tenant, query],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some((row.get::<String>(0)?, row.get::<String>(1)?))),
            None => Ok(None),
        }
    }

    /// All enabled scenes for fuzzy matching
    pub async fn scenes(&self, tenant: &str) -> Result<Vec<NamedRow>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                r#"
                SELECT entity_id, friendly_name, aliases FROM entities
                WHERE tenant = ?1 AND domain = 'scene' AND enabled = 1
                ORDER BY entity_id
                "#,
                params![tenant],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(NamedRow {
                id: row.get::<String>(0)?,
                name: text_or_null(row.get_value(1)?).unwrap_or_default(),
                aliases: parse_aliases(row.get_value(2)?),
            });
        }
        Ok(out)
    }

    /// Area exactly matching the normalized query
    pub async fn area_exact(&self, tenant: &str, query: &str) -> Result<Option<(String, String)>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT area_id, name FROM areas WHERE tenant = ?1 AND LOWER(name) = ?2 LIMIT 1",
                params![tenant, query],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some((row.get::<String>(0)?, row.get::<String>(1)?))),
            None => Ok(None),
        }
    }

    /// All areas for fuzzy matching
    pub async fn areas(&self, tenant: &str) -> Result<Vec<NamedRow>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                "SELECT area_id, name, aliases FROM areas WHERE tenant = ?1 ORDER BY area_id",
                params![tenant],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(NamedRow {
                id: row.get::<String>(0)?,
                name: row.get::<String>(1)?,
                aliases: parse_aliases(row.get_value(2)?),
            });
        }
        Ok(out)
    }

    /// Enabled device exactly matching the normalized query
    pub async fn device_exact(&self, tenant: &str, query: &str) -> Result<Option<(String, String)>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                r#"
                SELECT device_id, name FROM devices
                WHERE tenant = ?1 AND enabled = 1 AND LOWER(name) = ?2
                LIMIT 1
                "#,
                params![tenant, query],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some((row.get::<String>(0)?, row.get::<String>(1)?))),
            None => Ok(None),
        }
    }

    /// All enabled devices for fuzzy matching
    pub async fn devices(&self, tenant: &str) -> Result<Vec<NamedRow>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                r#"
                SELECT device_id, name, aliases FROM devices
                WHERE tenant = ?1 AND enabled = 1
                ORDER BY device_id
                "#,
                params![tenant],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(NamedRow {
                id: row.get::<String>(0)?,
                name: row.get::<String>(1)?,
                aliases: parse_aliases(row.get_value(2)?),
            });
        }
        Ok(out)
    }

    /// Enabled entity with exactly this id
    pub async fn entity_by_id(
        &self,
        tenant: &str,
        entity_id: &str,
    ) -> Result<Option<(String, Option<String>)>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                r#"
                SELECT entity_id, friendly_name FROM entities
                WHERE tenant = ?1 AND entity_id = ?2 AND enabled = 1
                "#,
                params![tenant, entity_id],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some((
                row.get::<String>(0)?,
                text_or_null(row.get_value(1)?),
            ))),
            None => Ok(None),
        }
    }

    /// All enabled entities for the fallback tier
    pub async fn entities(&self, tenant: &str) -> Result<Vec<EntityCandidate>> {
        let conn = self.connection()?;
        let mut rows = conn
            .query(
                r#"
                SELECT entity_id, domain, friendly_name, aliases FROM entities
                WHERE tenant = ?1 AND enabled = 1
                ORDER BY entity_id
                "#,
                params![tenant],
            )
            .await?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(EntityCandidate {
                entity_id: row.get::<String>(0)?,
                domain: row.get::<String>(1)?,
                friendly_name: text_or_null(row.get_value(2)?),
                aliases: parse_aliases(row.get_value(3)?),
            });
        }
        Ok(out)
    }

    // ------------------------------------------------------------------
    // Customization surface
    // ------------------------------------------------------------------

    /// Search entities by substring over id, friendly name, and aliases
    pub async fn search_entities(
        &self,
        tenant: &str,
        query: &str,
        domain: Option<&str>,
        enabled_only: bool,
    ) -> Result<Vec<EntityRow>> {
        let conn = self.connection()?;

        let pattern = if query.is_empty() {
            DbValue::Null
        } else {
            DbValue::Text(format!("%{}%", query.to_lowercase()))
        };

        let mut rows = conn
            .query(
                r#"
                SELECT entity_id, domain, friendly_name, area_id, device_id, device_class,
                       aliases, enabled, rules, notes, last_seen
                FROM entities
                WHERE tenant = ?1
                    AND (?2 = 0 OR enabled = 1)
                    AND (?3 IS NULL OR domain = ?3)
                    AND (?4 IS NULL
                         OR LOWER(entity_id) LIKE ?4
                         OR LOWER(friendly_name) LIKE ?4
                         OR LOWER(aliases) LIKE ?4)
                ORDER BY domain, friendly_name
                LIMIT 100
                "#,
                params![
                    tenant,
                    i64::from(enabled_only),
                    domain.map(|d| DbValue::Text(d.to_string())).unwrap_or(DbValue::Null),
                    pattern
                ],
            )
            .await?;
        let mut out = Vec::new();
        while let Some(row) = rows.next().await? {
            out.push(EntityRow {
                entity_id: row.get::<String>(0)?,
                domain: row.get::<String>(1)?,
                friendly_name: text_or_null(row.get_value(2)?),
                area_id: text_or_null(row.get_value(3)?),
                device_id: text_or_null(row.get_value(4)?),
                device_class: text_or_null(row.get_value(5)?),
                aliases: parse_aliases(row.get_value(6)?),
                enabled: row.get::<i64>(7)? != 0,
                rules: text_or_null(row.get_value(8)?)
                    .and_then(|raw| serde_json::from_str(&raw).ok())
                    .unwrap_or_else(|| Value::Object(Default::default())),
                notes: text_or_null(row.get_value(9)?),
                last_seen: text_or_null(row.get_value(10)?),
            });
        }
        Ok(out)
    }

    /// Apply user customizations to an entity; returns whether it exists
    pub async fn update_entity(
        &self,
        tenant: &str,
        entity_id: &str,
        patch: &EntityPatch,
    ) -> Result<bool> {
        if patch.is_empty() {
            return Err(HubError::invalid_input("No updates provided"));
        }

        let conn = self.connection()?;

        let aliases = match &patch.aliases {
            Some(aliases) => DbValue::Text(serde_json::to_string(aliases)?),
            None => DbValue::Null,
        };
        let rules = match &patch.rules {
            Some(rules) => DbValue::Text(serde_json::to_string(rules)?),
            None => DbValue::Null,
        };
        let enabled = match patch.enabled {
            Some(enabled) => DbValue::Integer(i64::from(enabled)),
            None => DbValue::Null,
        };

        let changed = conn
            .execute(
                r#"
                UPDATE entities SET
                    aliases = COALESCE(?1, aliases),
                    enabled = COALESCE(?2, enabled),
                    rules = COALESCE(?3, rules),
                    notes = COALESCE(?4, notes),
                    updated_at = ?5
                WHERE tenant = ?6 AND entity_id = ?7
                "#,
                params![
                    aliases,
                    enabled,
                    rules,
                    opt_text(&patch.notes),
                    now_rfc3339().as_str(),
                    tenant,
                    entity_id
                ],
            )
            .await?;
        Ok(changed > 0)
    }

    // ------------------------------------------------------------------

    async fn ids(&self, conn: &Connection, sql: &str, tenant: &str) -> Result<HashSet<String>> {
        let mut rows = conn.query(sql, params![tenant]).await?;
        let mut out = HashSet::new();
        while let Some(row) = rows.next().await? {
            out.insert(row.get::<String>(0)?);
        }
        Ok(out)
    }
}

fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn opt_text(value: &Option<String>) -> DbValue {
    match value {
        Some(text) => DbValue::Text(text.clone()),
        None => DbValue::Null,
    }
}

fn text_or_null(value: DbValue) -> Option<String> {
    match value {
        DbValue::Text(text) => Some(text),
        _ => None,
    }
}

fn parse_aliases(value: DbValue) -> Vec<String> {
    text_or_null(value)
        .and_then(|raw| serde_json::from_str(&raw).ok())
        .unwrap_or_default()
}
