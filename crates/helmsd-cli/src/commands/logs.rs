//! Logs command - tail the daemon's log feed

use anyhow::Result;
use helmsd_client::Daemon;

use super::init_error;

/// Tail daemon logs until Ctrl+C
pub async fn logs(daemon: &Daemon, json: bool) -> Result<()> {
    let reader = daemon.logs_stream().await.map_err(init_error)?;
    let mut cursor = reader.subscribe();

    eprintln!("tailing daemon logs, Ctrl+C to stop");

    let mut last_seq = 0u64;
    loop {
        tokio::select! {
            record = cursor.next() => {
                let record = match record {
                    Ok(record) => record,
                    // Closed is the only terminal cursor error.
                    Err(_) => break,
                };
                if last_seq != 0 && record.seq > last_seq + 1 {
                    eprintln!("... {} records dropped (consumer too slow)", record.seq - last_seq - 1);
                }
                last_seq = record.seq;

                if json {
                    println!("{}", serde_json::to_string(&*record.payload)?);
                } else {
                    println!("[{}] {}", record.payload.level, record.payload.payload);
                }
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    daemon.close_streams();
    Ok(())
}
