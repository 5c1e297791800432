//! Control client for the helmsd proxy daemon
//!
//! Resolves the daemon's control-plane address and secret, issues typed REST
//! calls (config, rules, proxies, providers, connections) and consumes the
//! two real-time feeds (log lines, connection snapshots) through bounded,
//! replay-safe stream readers with exactly-once lazy initialization.
//!
//! # Example
//!
//! ```rust,no_run
//! use helmsd_client::{Daemon, EndpointOptions};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let daemon = Daemon::new(EndpointOptions::default());
//!
//!     // REST: list proxies
//!     let client = daemon.client().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
//!     let proxies = client.get_proxies().await?;
//!     println!("{} proxies", proxies.proxies.len());
//!
//!     // Feed: tail logs. Concurrent callers share one reader; each cursor
//!     // reads independently.
//!     let logs = daemon.logs_stream().await.map_err(|e| anyhow::anyhow!(e.to_string()))?;
//!     let mut cursor = logs.subscribe();
//!     while let Ok(record) = cursor.next().await {
//!         println!("#{} {}", record.seq, record.payload.payload);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides an in-process fake daemon serving the REST
//! surface and both feeds over chunked HTTP and WebSocket:
//!
//! ```rust,ignore
//! use helmsd_client::testing::TestDaemon;
//!
//! let daemon = TestDaemon::start().await?;
//! daemon.push_log(helmsd_core::LogLevel::Info, "hello");
//! ```

mod client;
mod daemon;
mod endpoint;
mod error;
mod singleton;
pub mod streaming;
pub mod testing;

pub use client::ControlClient;
pub use daemon::{connections_stream, global, logs_stream, Daemon, SharedResult};
pub use endpoint::{resolve, Endpoint, EndpointOptions};
pub use error::{ClientError, Result};
pub use singleton::AsyncSingleton;

// Re-export streaming types for convenience
pub use streaming::{StreamConfig, StreamCursor, StreamError, StreamReader, StreamRecord};

// Re-export core types for convenience
pub use helmsd_core::{ConnectionsSnapshot, DaemonConfig, LogLevel, LogRecord};
