//! Connection commands - snapshot and close active connections

use anyhow::{bail, Result};
use helmsd_client::ControlClient;

/// Show active connections
pub async fn connections(client: &ControlClient, json: bool) -> Result<()> {
    let snapshot = client.get_connections().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
        return Ok(());
    }

    println!(
        "{} connections, {} down / {} up",
        snapshot.connections.len(),
        snapshot.download_total,
        snapshot.upload_total
    );

    for conn in &snapshot.connections {
        let target = if conn.metadata.host.is_empty() {
            format!(
                "{}:{}",
                conn.metadata.destination_ip, conn.metadata.destination_port
            )
        } else {
            format!("{}:{}", conn.metadata.host, conn.metadata.destination_port)
        };
        println!(
            "{}  {}  {}  via {}  [{}]",
            conn.id,
            conn.metadata.network,
            target,
            conn.chains.join(" > "),
            conn.rule
        );
    }
    Ok(())
}

/// Close one connection or all of them
pub async fn close(client: &ControlClient, id: Option<&str>, all: bool) -> Result<()> {
    match (id, all) {
        (_, true) => {
            client.close_all_connections().await?;
            println!("all connections closed");
        }
        (Some(id), false) => {
            client.close_connection(id).await?;
            println!("connection {} closed", id);
        }
        (None, false) => bail!("pass a connection ID or --all"),
    }
    Ok(())
}
