//! Daemon handle: lazily initialized client and feed singletons
//!
//! A [`Daemon`] owns three independently cached singletons: the REST client,
//! the log feed reader and the connections feed reader. Each is built at
//! most once per handle regardless of concurrent demand; a failed build is
//! cached and returned to every later caller (create a fresh handle to
//! retry). [`global`] provides the process-wide handle resolved from the
//! environment.

use std::sync::{Arc, OnceLock};

use tracing::debug;

use helmsd_core::{ConnectionsSnapshot, LogRecord};

use crate::client::ControlClient;
use crate::endpoint::{self, EndpointOptions};
use crate::error::ClientError;
use crate::singleton::AsyncSingleton;
use crate::streaming::{StreamConfig, StreamReader, DEFAULT_BUFFER_LENGTH};

/// Outcome of a singleton resolution, shared between all callers
pub type SharedResult<T> = std::result::Result<Arc<T>, Arc<ClientError>>;

/// Handle to one control-plane daemon
pub struct Daemon {
    options: EndpointOptions,
    client: AsyncSingleton<ControlClient, ClientError>,
    logs: AsyncSingleton<StreamReader<LogRecord>, ClientError>,
    connections: AsyncSingleton<StreamReader<ConnectionsSnapshot>, ClientError>,
}

impl Daemon {
    /// Create a handle; nothing is resolved until first use
    pub fn new(options: EndpointOptions) -> Self {
        Self {
            options,
            client: AsyncSingleton::new(),
            logs: AsyncSingleton::new(),
            connections: AsyncSingleton::new(),
        }
    }

    /// Handle resolved purely from environment variables and defaults
    pub fn from_env() -> Self {
        Self::new(EndpointOptions::default())
    }

    /// The REST client, built once from the resolved endpoint
    ///
    /// Endpoint resolution failures are fatal and cached: every later call
    /// observes the same error.
    pub async fn client(&self) -> SharedResult<ControlClient> {
        self.client
            .get(|| async {
                let resolved = endpoint::resolve(&self.options)?;
                debug!(host = %resolved.hostname, port = resolved.port, "resolved control endpoint");
                ControlClient::new(&resolved)
            })
            .await
    }

    /// The log feed reader, built once per handle
    ///
    /// The first caller resolves the endpoint, fetches the daemon config to
    /// parameterize the feed URL with the active log level, probes the
    /// version (best effort) and constructs the reader; everyone else gets
    /// the cached instance.
    pub async fn logs_stream(&self) -> SharedResult<StreamReader<LogRecord>> {
        self.logs
            .get(|| async {
                let client = self.client().await.map_err(shared_to_init)?;
                let config = client.get_config().await?;
                probe_version(&client).await;

                let mut url = client.base_url().join("logs")?;
                url.query_pairs_mut()
                    .append_pair("level", config.log_level.as_str());

                Ok(StreamReader::new(StreamConfig {
                    url,
                    buffer_length: DEFAULT_BUFFER_LENGTH,
                    token: client.secret().map(str::to_owned),
                    prefer_websocket: true,
                })?)
            })
            .await
    }

    /// The connections feed reader, built once per handle
    pub async fn connections_stream(&self) -> SharedResult<StreamReader<ConnectionsSnapshot>> {
        self.connections
            .get(|| async {
                let client = self.client().await.map_err(shared_to_init)?;
                probe_version(&client).await;

                let url = client.base_url().join("connections")?;

                Ok(StreamReader::new(StreamConfig {
                    url,
                    buffer_length: DEFAULT_BUFFER_LENGTH,
                    token: client.secret().map(str::to_owned),
                    prefer_websocket: true,
                })?)
            })
            .await
    }

    /// Close both feed readers, if they were ever built
    ///
    /// The singletons stay settled; this releases transports and wakes
    /// subscribers with a closed signal.
    pub fn close_streams(&self) {
        if let Some(Ok(reader)) = self.logs.peek() {
            reader.close();
        }
        if let Some(Ok(reader)) = self.connections.peek() {
            reader.close();
        }
    }
}

/// Best-effort version probe; the result never gates transport selection
async fn probe_version(client: &ControlClient) {
    match client.get_version().await {
        Ok(version) => debug!(version = %version.version, "daemon version"),
        Err(e) => debug!(error = %e, "version probe failed, continuing with version unknown"),
    }
}

/// Flatten a cached upstream singleton failure into this factory's error
fn shared_to_init(e: Arc<ClientError>) -> ClientError {
    ClientError::Init(e.to_string())
}

static GLOBAL: OnceLock<Daemon> = OnceLock::new();

/// The process-wide daemon handle, resolved from the environment
pub fn global() -> &'static Daemon {
    GLOBAL.get_or_init(Daemon::from_env)
}

/// Process-wide log feed singleton
pub async fn logs_stream() -> SharedResult<StreamReader<LogRecord>> {
    global().logs_stream().await
}

/// Process-wide connections feed singleton
pub async fn connections_stream() -> SharedResult<StreamReader<ConnectionsSnapshot>> {
    global().connections_stream().await
}
