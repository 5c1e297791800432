//! Version command

use anyhow::Result;
use helmsd_client::ControlClient;

/// Show the daemon version
pub async fn version(client: &ControlClient, json: bool) -> Result<()> {
    let version = client.get_version().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&version)?);
    } else {
        println!("helmsd {}", version.version);
        if version.premium == Some(true) {
            println!("premium features enabled");
        }
    }
    Ok(())
}
