//! Target resolver integration tests over a seeded registry mirror

mod common;

use common::*;
use hublink::{ResolverConfig, ServiceTarget, TargetResolver, TargetType};

fn resolver(store: &hublink::RegistryStore) -> TargetResolver {
    TargetResolver::new(store.clone(), ResolverConfig::default())
}

#[tokio::test]
async fn exact_area_name_resolves_with_full_confidence() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-area";
    seed_area(&store, tenant, "bedroom_area", "Bedroom").await;

    let resolution = resolver(&store).resolve("bedroom", None, tenant).await;

    assert_eq!(resolution.target_type, TargetType::Area);
    assert_eq!(resolution.target_id.as_deref(), Some("bedroom_area"));
    assert_eq!(resolution.confidence, 100.0);
    assert!(!resolution.suggestion);
    assert_eq!(
        resolution.target,
        Some(ServiceTarget::area("bedroom_area"))
    );
    assert!(resolution.error.is_none());
}

#[tokio::test]
async fn scene_alias_matches_case_insensitively() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-scene-alias";
    seed_entity(&store, tenant, "scene.movie_time", "scene", Some("Film Mode")).await;
    set_aliases(&store, tenant, "scene.movie_time", &["Movie Time"]).await;

    let resolution = resolver(&store).resolve("movie time", None, tenant).await;

    assert_eq!(resolution.target_type, TargetType::Scene);
    assert_eq!(resolution.target_id.as_deref(), Some("scene.movie_time"));
    assert_eq!(resolution.confidence, 100.0);
    assert!(!resolution.suggestion);
    // Scenes are entities; the target payload carries the entity id.
    assert_eq!(
        resolution.target,
        Some(ServiceTarget::entity("scene.movie_time"))
    );
}

#[tokio::test]
async fn scene_tier_outranks_identically_named_area() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-priority";
    seed_area(&store, tenant, "bedroom_area", "Bedroom").await;
    seed_entity(&store, tenant, "scene.bedroom", "scene", Some("Bedroom")).await;

    let resolution = resolver(&store).resolve("Bedroom", None, tenant).await;

    assert_eq!(resolution.target_type, TargetType::Scene);
    assert_eq!(resolution.target_id.as_deref(), Some("scene.bedroom"));
    assert_eq!(resolution.confidence, 100.0);
}

#[tokio::test]
async fn fuzzy_area_match_in_band_is_flagged_as_suggestion() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-suggestion";
    seed_area(&store, tenant, "kitchen_area", "Kitchen").await;

    // "kitten" vs "kitchen" shares the subsequence k-i-t-e-n:
    // 2*5 / (6+7) ~ 76.9, inside the 70..85 suggestion band.
    let resolution = resolver(&store).resolve("kitten", None, tenant).await;

    assert_eq!(resolution.target_type, TargetType::Area);
    assert_eq!(resolution.target_id.as_deref(), Some("kitchen_area"));
    assert!(resolution.confidence >= 70.0 && resolution.confidence < 85.0);
    assert!(resolution.suggestion);
}

#[tokio::test]
async fn thresholds_come_from_configuration() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-config";
    seed_area(&store, tenant, "kitchen_area", "Kitchen").await;

    let strict = TargetResolver::new(
        store.clone(),
        ResolverConfig {
            match_threshold: 90.0,
            suggestion_threshold: 95.0,
        },
    );
    let resolution = strict.resolve("kitten", None, tenant).await;

    assert_eq!(resolution.target_type, TargetType::None);
    assert_eq!(resolution.confidence, 0.0);
}

#[tokio::test]
async fn device_tier_matches_device_names() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-device";
    seed_device(&store, tenant, "dev-1", "Espresso Machine", None).await;

    let resolution = resolver(&store).resolve("espresso machine", None, tenant).await;

    assert_eq!(resolution.target_type, TargetType::Device);
    assert_eq!(resolution.target_id.as_deref(), Some("dev-1"));
    assert_eq!(resolution.target, Some(ServiceTarget::device("dev-1")));
}

#[tokio::test]
async fn entity_tier_is_token_order_insensitive() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-tokens";
    seed_entity(
        &store,
        tenant,
        "light.office_desk",
        "light",
        Some("Office Desk Lamp"),
    )
    .await;

    // The query's tokens are a subset of the name's.
    let resolution = resolver(&store).resolve("desk lamp", None, tenant).await;

    assert_eq!(resolution.target_type, TargetType::Entity);
    assert_eq!(resolution.target_id.as_deref(), Some("light.office_desk"));
    assert_eq!(resolution.confidence, 100.0);
}

#[tokio::test]
async fn entity_alias_exact_match_returns_immediately() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-alias";
    seed_entity(&store, tenant, "switch.fan_1", "switch", Some("Ceiling Fan")).await;
    set_aliases(&store, tenant, "switch.fan_1", &["Breeze Machine"]).await;

    let resolution = resolver(&store).resolve("Breeze Machine", None, tenant).await;

    assert_eq!(resolution.target_type, TargetType::Entity);
    assert_eq!(resolution.target_id.as_deref(), Some("switch.fan_1"));
    assert_eq!(resolution.confidence, 100.0);
    assert_eq!(resolution.matched_name.as_deref(), Some("Breeze Machine"));
}

#[tokio::test]
async fn exact_entity_id_resolves() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-entity-id";
    seed_entity(&store, tenant, "light.desk_lamp", "light", Some("Desk Lamp")).await;

    let resolution = resolver(&store).resolve("light.desk_lamp", None, tenant).await;

    assert_eq!(resolution.target_type, TargetType::Entity);
    assert_eq!(resolution.target_id.as_deref(), Some("light.desk_lamp"));
    assert_eq!(resolution.confidence, 100.0);
}

#[tokio::test]
async fn domain_filter_restricts_entity_candidates() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-domain";
    seed_entity(&store, tenant, "light.desk_lamp", "light", Some("Desk Lamp")).await;
    seed_entity(&store, tenant, "switch.heater", "switch", Some("Heater")).await;

    let unfiltered = resolver(&store).resolve("desk lamp", None, tenant).await;
    assert_eq!(unfiltered.target_id.as_deref(), Some("light.desk_lamp"));

    let filtered = resolver(&store)
        .resolve("desk lamp", Some("switch"), tenant)
        .await;
    assert_eq!(filtered.target_type, TargetType::None);
}

#[tokio::test]
async fn disabled_entities_are_not_candidates() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-disabled";
    seed_entity(&store, tenant, "light.desk_lamp", "light", Some("Desk Lamp")).await;
    let patch = hublink::storage::EntityPatch {
        enabled: Some(false),
        ..Default::default()
    };
    store.update_entity(tenant, "light.desk_lamp", &patch).await.unwrap();

    let resolution = resolver(&store).resolve("desk lamp", None, tenant).await;
    assert_eq!(resolution.target_type, TargetType::None);
}

#[tokio::test]
async fn miss_across_all_tiers_names_the_query() {
    let (store, _dir) = temp_store().await;
    let tenant = "t-miss";
    seed_area(&store, tenant, "bedroom_area", "Bedroom").await;

    let resolution = resolver(&store).resolve("flux capacitor", None, tenant).await;

    assert_eq!(resolution.target_type, TargetType::None);
    assert_eq!(resolution.confidence, 0.0);
    assert!(!resolution.suggestion);
    assert!(resolution.target.is_none());
    assert!(resolution
        .error
        .as_deref()
        .unwrap()
        .contains("flux capacitor"));
}

#[tokio::test]
async fn tenants_are_isolated() {
    let (store, _dir) = temp_store().await;
    seed_area(&store, "alpha", "bedroom_area", "Bedroom").await;

    let resolution = resolver(&store).resolve("bedroom", None, "beta").await;
    assert_eq!(resolution.target_type, TargetType::None);
}
