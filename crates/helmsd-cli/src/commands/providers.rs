//! Provider commands - list and refresh proxy providers

use anyhow::Result;
use helmsd_client::ControlClient;

/// List proxy providers
pub async fn providers(client: &ControlClient, json: bool) -> Result<()> {
    let response = client.get_providers().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let mut names: Vec<&String> = response.providers.keys().collect();
    names.sort();

    for name in names {
        let provider = &response.providers[name];
        let updated = provider
            .updated_at
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| "never".to_string());
        println!(
            "{}  [{}/{}]  {} proxies, updated {}",
            name,
            provider.provider_type,
            provider.vehicle_type,
            provider.proxies.len(),
            updated
        );
    }
    Ok(())
}

/// Trigger a provider refresh
pub async fn update_provider(client: &ControlClient, name: &str) -> Result<()> {
    client.update_provider(name).await?;
    println!("provider {} refresh triggered", name);
    Ok(())
}
