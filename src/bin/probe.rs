//! Connectivity probe for a hub deployment
//!
//! Connects with the environment configuration, prints the session status,
//! and optionally resolves a query passed as the first argument:
//!
//! ```text
//! HUB_URL=http://hub.local:8123 HUB_TOKEN=... hublink-probe "desk lamp"
//! ```

use hublink::{AppConfig, HubClient, RegistryStore, TargetResolver};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    hublink::logging::init();

    let config = AppConfig::from_env()?;
    let client = HubClient::new(config.hub.clone())?;

    let connected = client.connect().await;
    let status = client.status();
    println!("connected: {connected}");
    println!("status: {}", serde_json::to_string_pretty(&status)?);

    if let Some(query) = std::env::args().nth(1) {
        let store = RegistryStore::open(&config.store.database_path).await?;
        let summary = hublink::sync::sync_all(&client, &store, &config.hub.default_tenant).await;
        println!("sync: {}", serde_json::to_string_pretty(&summary)?);

        let entities =
            hublink::sync::sync_entities(&client, &store, &config.hub.default_tenant).await;
        println!("entities: {}", serde_json::to_string_pretty(&entities)?);

        let resolver = TargetResolver::new(store, config.resolver.clone());
        let resolution = resolver
            .resolve(&query, None, &config.hub.default_tenant)
            .await;
        println!("resolution: {}", serde_json::to_string_pretty(&resolution)?);
    }

    client.disconnect().await;
    Ok(())
}
