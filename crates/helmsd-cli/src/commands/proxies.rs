//! Proxy commands - list, inspect, select and probe proxies

use anyhow::Result;
use helmsd_client::ControlClient;

/// List all proxies and groups
pub async fn proxies(client: &ControlClient, json: bool) -> Result<()> {
    let response = client.get_proxies().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    let mut names: Vec<&String> = response.proxies.keys().collect();
    names.sort();

    for name in names {
        let proxy = &response.proxies[name];
        if proxy.is_group() {
            let now = proxy.now.as_deref().unwrap_or("-");
            let members = proxy.all.as_ref().map(Vec::len).unwrap_or(0);
            println!("{}  [{}]  -> {} ({} members)", name, proxy.proxy_type, now, members);
        } else {
            println!("{}  [{}]", name, proxy.proxy_type);
        }
    }
    Ok(())
}

/// Show one proxy or group
pub async fn proxy(client: &ControlClient, name: &str, json: bool) -> Result<()> {
    let proxy = client.get_proxy(name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&proxy)?);
        return Ok(());
    }

    println!("name: {}", proxy.name);
    println!("type: {}", proxy.proxy_type);
    if let Some(now) = &proxy.now {
        println!("now:  {}", now);
    }
    if let Some(all) = &proxy.all {
        println!("members: {}", all.join(", "));
    }
    if let Some(probe) = proxy.history.last() {
        println!("last delay: {}ms", probe.delay);
    }
    Ok(())
}

/// Switch the selected member of a selector group
pub async fn select(client: &ControlClient, group: &str, name: &str) -> Result<()> {
    client.select_proxy(group, name).await?;
    println!("{} -> {}", group, name);
    Ok(())
}

/// Measure a proxy's latency
pub async fn delay(
    client: &ControlClient,
    name: &str,
    timeout_ms: u32,
    probe_url: Option<&str>,
) -> Result<()> {
    let response = match probe_url {
        Some(url) => client.test_delay_against(name, url, timeout_ms).await?,
        None => client.test_delay(name, timeout_ms).await?,
    };
    println!("{}: {}ms", name, response.delay);
    Ok(())
}
