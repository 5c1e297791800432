//! Watch command - follow live connection snapshots

use anyhow::Result;
use helmsd_client::Daemon;

use super::init_error;

/// Print connection snapshots as the daemon pushes them, until Ctrl+C
pub async fn watch(daemon: &Daemon, json: bool) -> Result<()> {
    let reader = daemon.connections_stream().await.map_err(init_error)?;
    let mut cursor = reader.subscribe();

    eprintln!("watching connections, Ctrl+C to stop");

    loop {
        tokio::select! {
            record = cursor.next() => {
                let snapshot = match record {
                    Ok(record) => record.payload,
                    Err(_) => break,
                };

                if json {
                    println!("{}", serde_json::to_string(&*snapshot)?);
                } else {
                    println!(
                        "{} connections, {} down / {} up",
                        snapshot.connections.len(),
                        snapshot.download_total,
                        snapshot.upload_total
                    );
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    daemon.close_streams();
    Ok(())
}
