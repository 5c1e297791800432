//! Config commands - show and patch the daemon configuration

use anyhow::{bail, Result};
use helmsd_client::ControlClient;
use helmsd_core::{ConfigPatch, LogLevel};

/// Changes collected from `config set` flags
#[derive(Debug, Default)]
pub struct ConfigChanges {
    pub mode: Option<String>,
    pub log_level: Option<String>,
    pub allow_lan: Option<bool>,
    pub port: Option<u16>,
    pub socks_port: Option<u16>,
    pub mixed_port: Option<u16>,
}

/// Print the current configuration
pub async fn show_config(client: &ControlClient, json: bool) -> Result<()> {
    let config = client.get_config().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        println!("mode:       {}", config.mode);
        println!("log-level:  {}", config.log_level);
        println!("port:       {}", config.port);
        println!("socks-port: {}", config.socks_port);
        println!("mixed-port: {}", config.mixed_port);
        println!("allow-lan:  {}", config.allow_lan);
        if let Some(addr) = &config.bind_address {
            println!("bind:       {}", addr);
        }
    }
    Ok(())
}

/// Apply a partial configuration update
pub async fn set_config(client: &ControlClient, changes: ConfigChanges) -> Result<()> {
    let log_level = match changes.log_level.as_deref() {
        Some(raw) => match raw.parse::<LogLevel>() {
            Ok(level) => Some(level),
            Err(_) => bail!("unknown log level: {}", raw),
        },
        None => None,
    };

    let patch = ConfigPatch {
        port: changes.port,
        socks_port: changes.socks_port,
        mixed_port: changes.mixed_port,
        allow_lan: changes.allow_lan,
        mode: changes.mode,
        log_level,
    };

    if serde_json::to_value(&patch)? == serde_json::json!({}) {
        bail!("nothing to change; pass at least one --flag");
    }

    client.patch_config(&patch).await?;
    println!("configuration updated");
    Ok(())
}
