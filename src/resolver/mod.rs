//! Natural-language target resolution
//!
//! Resolves a free-text phrase ("bedroom", "movie time", "desk lamp") to a
//! precise control target through four tiers evaluated in strict priority
//! order: scenes, areas, devices, then entities as the terminal fallback.
//! The first tier to reach the configured confidence threshold wins. The
//! first three tiers score with a character-level ratio; the entity tier
//! scores with token-set similarity because entity names are frequently
//! multi-word — that asymmetry is deliberate.

pub mod similarity;

use crate::client::ServiceTarget;
use crate::config::ResolverConfig;
use crate::storage::{EntityCandidate, NamedRow, RegistryStore};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

/// What a resolution landed on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    Scene,
    Area,
    Device,
    Entity,
    None,
}

/// Resolver output, directly consumable by `call_service`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resolution {
    /// Tier that matched, or `none`
    pub target_type: TargetType,

    /// Matched id (scene entity id, area id, device id, or entity id)
    pub target_id: Option<String>,

    /// Match confidence, 0-100
    pub confidence: f64,

    /// The name or alias that actually matched
    pub matched_name: Option<String>,

    /// True when the match is probably right but worth confirming
    pub suggestion: bool,

    /// Target payload in the exact shape `call_service` expects
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<ServiceTarget>,

    /// Why resolution failed, when it did
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Resolution {
    fn no_match(query: &str) -> Self {
        Self {
            target_type: TargetType::None,
            target_id: None,
            confidence: 0.0,
            matched_name: None,
            suggestion: false,
            target: None,
            error: Some(format!(
                "No matching scene, area, device, or entity found for '{query}'"
            )),
        }
    }
}

/// Tiered fuzzy resolver over the registry mirror
#[derive(Clone)]
pub struct TargetResolver {
    store: RegistryStore,
    config: ResolverConfig,
}

impl TargetResolver {
    /// Create a resolver over the given store
    pub fn new(store: RegistryStore, config: ResolverConfig) -> Self {
        Self { store, config }
    }

    /// Resolve a phrase to a control target.
    ///
    /// `domain` restricts only the entity fallback tier. Never fails: data
    /// errors in a tier are logged and that tier treated as matchless, and
    /// an overall miss comes back as a structured `target_type: none`
    /// result.
    pub async fn resolve(&self, query: &str, domain: Option<&str>, tenant: &str) -> Resolution {
        let normalized = query.trim().to_lowercase();

        if let Some(resolution) = self.resolve_scene(&normalized, tenant).await {
            return resolution;
        }
        if let Some(resolution) = self.resolve_area(&normalized, tenant).await {
            return resolution;
        }
        if let Some(resolution) = self.resolve_device(&normalized, tenant).await {
            return resolution;
        }
        if let Some(resolution) = self.resolve_entity(&normalized, domain, tenant).await {
            return resolution;
        }

        debug!(query, "No target matched in any tier");
        Resolution::no_match(query)
    }

    async fn resolve_scene(&self, query: &str, tenant: &str) -> Option<Resolution> {
        match self.try_scene(query, tenant).await {
            Ok(resolution) => resolution,
            Err(e) => {
                error!(error = %e, "Error resolving scene");
                None
            }
        }
    }

    async fn try_scene(&self, query: &str, tenant: &str) -> crate::Result<Option<Resolution>> {
        if let Some((entity_id, name)) = self.store.scene_exact(tenant, query).await? {
            return Ok(Some(self.exact(
                TargetType::Scene,
                entity_id.clone(),
                Some(name),
                ServiceTarget::entity(entity_id),
            )));
        }

        let scenes = self.store.scenes(tenant).await?;
        Ok(self.best_named(TargetType::Scene, query, &scenes))
    }

    async fn resolve_area(&self, query: &str, tenant: &str) -> Option<Resolution> {
        match self.try_area(query, tenant).await {
            Ok(resolution) => resolution,
            Err(e) => {
                error!(error = %e, "Error resolving area");
                None
            }
        }
    }

    async fn try_area(&self, query: &str, tenant: &str) -> crate::Result<Option<Resolution>> {
        if let Some((area_id, name)) = self.store.area_exact(tenant, query).await? {
            return Ok(Some(self.exact(
                TargetType::Area,
                area_id.clone(),
                Some(name),
                ServiceTarget::area(area_id),
            )));
        }

        let areas = self.store.areas(tenant).await?;
        Ok(self.best_named(TargetType::Area, query, &areas))
    }

    async fn resolve_device(&self, query: &str, tenant: &str) -> Option<Resolution> {
        match self.try_device(query, tenant).await {
            Ok(resolution) => resolution,
            Err(e) => {
                error!(error = %e, "Error resolving device");
                None
            }
        }
    }

    async fn try_device(&self, query: &str, tenant: &str) -> crate::Result<Option<Resolution>> {
        if let Some((device_id, name)) = self.store.device_exact(tenant, query).await? {
            return Ok(Some(self.exact(
                TargetType::Device,
                device_id.clone(),
                Some(name),
                ServiceTarget::device(device_id),
            )));
        }

        let devices = self.store.devices(tenant).await?;
        Ok(self.best_named(TargetType::Device, query, &devices))
    }

    async fn resolve_entity(
        &self,
        query: &str,
        domain: Option<&str>,
        tenant: &str,
    ) -> Option<Resolution> {
        match self.try_entity(query, domain, tenant).await {
            Ok(resolution) => resolution,
            Err(e) => {
                error!(error = %e, "Error resolving entity");
                None
            }
        }
    }

    async fn try_entity(
        &self,
        query: &str,
        domain: Option<&str>,
        tenant: &str,
    ) -> crate::Result<Option<Resolution>> {
        // An exact entity id is unambiguous; the domain filter is not
        // consulted for it.
        if let Some((entity_id, friendly_name)) = self.store.entity_by_id(tenant, query).await? {
            return Ok(Some(self.exact(
                TargetType::Entity,
                entity_id.clone(),
                friendly_name,
                ServiceTarget::entity(entity_id),
            )));
        }

        let entities = self.store.entities(tenant).await?;
        let candidates: Vec<&EntityCandidate> = entities
            .iter()
            .filter(|e| domain.map_or(true, |d| e.domain == d))
            .collect();

        // Exact alias match wins outright.
        for candidate in &candidates {
            for alias in &candidate.aliases {
                if query == alias.to_lowercase() {
                    return Ok(Some(self.exact(
                        TargetType::Entity,
                        candidate.entity_id.clone(),
                        Some(alias.clone()),
                        ServiceTarget::entity(candidate.entity_id.clone()),
                    )));
                }
            }
        }

        // Token-set scoring over friendly names and aliases.
        let mut best: Option<(String, String, f64)> = None;
        let mut best_score = 0.0;
        for candidate in &candidates {
            if let Some(name) = &candidate.friendly_name {
                let score = similarity::token_set_ratio(query, &name.to_lowercase());
                if score > best_score {
                    best_score = score;
                    best = Some((candidate.entity_id.clone(), name.clone(), score));
                }
            }
            for alias in &candidate.aliases {
                let score = similarity::token_set_ratio(query, &alias.to_lowercase());
                if score > best_score {
                    best_score = score;
                    best = Some((candidate.entity_id.clone(), alias.clone(), score));
                }
            }
        }

        Ok(best.and_then(|(entity_id, matched_name, score)| {
            let confidence = score * 100.0;
            (confidence >= self.config.match_threshold).then(|| {
                self.scored(
                    TargetType::Entity,
                    entity_id.clone(),
                    matched_name,
                    confidence,
                    ServiceTarget::entity(entity_id),
                )
            })
        }))
    }

    /// Best character-ratio match over primary names and aliases.
    ///
    /// Ties keep the first-seen candidate: only a strictly greater score
    /// replaces the current best.
    fn best_named(
        &self,
        target_type: TargetType,
        query: &str,
        rows: &[NamedRow],
    ) -> Option<Resolution> {
        let mut best: Option<(String, String, f64)> = None;
        let mut best_score = 0.0;

        for row in rows {
            let score = similarity::ratio(query, &row.name.to_lowercase());
            if score > best_score {
                best_score = score;
                best = Some((row.id.clone(), row.name.clone(), score));
            }

            for alias in &row.aliases {
                let score = similarity::ratio(query, &alias.to_lowercase());
                if score > best_score {
                    best_score = score;
                    best = Some((row.id.clone(), alias.clone(), score));
                }
            }
        }

        best.and_then(|(id, matched_name, score)| {
            let confidence = score * 100.0;
            (confidence >= self.config.match_threshold).then(|| {
                let target = Self::target_for(target_type, &id);
                self.scored(target_type, id, matched_name, confidence, target)
            })
        })
    }

    fn target_for(target_type: TargetType, id: &str) -> ServiceTarget {
        match target_type {
            TargetType::Area => ServiceTarget::area(id),
            TargetType::Device => ServiceTarget::device(id),
            // Scenes are entities; the entity tier and `none` never get here.
            _ => ServiceTarget::entity(id),
        }
    }

    fn exact(
        &self,
        target_type: TargetType,
        target_id: String,
        matched_name: Option<String>,
        target: ServiceTarget,
    ) -> Resolution {
        Resolution {
            target_type,
            target_id: Some(target_id),
            confidence: 100.0,
            matched_name,
            suggestion: self.is_suggestion(100.0),
            target: Some(target),
            error: None,
        }
    }

    fn scored(
        &self,
        target_type: TargetType,
        target_id: String,
        matched_name: String,
        confidence: f64,
        target: ServiceTarget,
    ) -> Resolution {
        Resolution {
            target_type,
            target_id: Some(target_id),
            confidence,
            matched_name: Some(matched_name),
            suggestion: self.is_suggestion(confidence),
            target: Some(target),
            error: None,
        }
    }

    fn is_suggestion(&self, confidence: f64) -> bool {
        confidence >= self.config.match_threshold && confidence < self.config.suggestion_threshold
    }
}
