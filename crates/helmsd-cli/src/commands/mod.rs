//! Command implementations for the helmsd CLI

pub mod config;
pub mod connections;
pub mod logs;
pub mod providers;
pub mod proxies;
pub mod rules;
pub mod version;
pub mod watch;

pub use config::{set_config, show_config, ConfigChanges};
pub use connections::{close, connections};
pub use logs::logs;
pub use providers::{providers, update_provider};
pub use proxies::{delay, proxies, proxy, select};
pub use rules::rules;
pub use version::version;
pub use watch::watch;

use std::sync::Arc;

use helmsd_client::ClientError;

/// Flatten a shared singleton failure into an anyhow error
pub(crate) fn init_error(e: Arc<ClientError>) -> anyhow::Error {
    anyhow::anyhow!("{}", e)
}
