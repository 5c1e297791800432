//! Rules command - list routing rules

use anyhow::Result;
use helmsd_client::ControlClient;

/// List routing rules in evaluation order
pub async fn rules(client: &ControlClient, json: bool) -> Result<()> {
    let response = client.get_rules().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&response)?);
        return Ok(());
    }

    for (index, rule) in response.rules.iter().enumerate() {
        if rule.payload.is_empty() {
            println!("{:4}  {}  -> {}", index, rule.rule_type, rule.proxy);
        } else {
            println!(
                "{:4}  {}({})  -> {}",
                index, rule.rule_type, rule.payload, rule.proxy
            );
        }
    }
    Ok(())
}
