//! Typed HTTP client for the daemon control API

use std::time::Duration;

use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use helmsd_core::{
    ConfigPatch, ConnectionsSnapshot, DaemonConfig, DelayResponse, ProvidersResponse, Proxy,
    ProxiesResponse, RulesResponse, SelectProxyRequest, Version,
};

use crate::endpoint::Endpoint;
use crate::error::{ClientError, Result};

/// URL-encode a proxy/provider name for use as a path segment.
///
/// Group names routinely contain spaces, slashes and emoji; they must form a
/// single path segment.
fn encode_path_segment(name: &str) -> String {
    name.replace('%', "%25")
        .replace('/', "%2F")
        .replace(' ', "%20")
}

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default latency-probe target
const DEFAULT_DELAY_TEST_URL: &str = "http://www.gstatic.com/generate_204";

/// Control API client
///
/// Thin typed wrapper over the daemon's REST surface. Cheap to clone; all
/// clones share one connection pool and the bearer secret.
#[derive(Debug, Clone)]
pub struct ControlClient {
    client: Client,
    base_url: Url,
    secret: Option<String>,
}

impl ControlClient {
    /// Create a client for a resolved endpoint
    ///
    /// The secret, when present, is sent as a default
    /// `Authorization: Bearer <secret>` header on every request.
    pub fn new(endpoint: &Endpoint) -> Result<Self> {
        Self::with_config(endpoint, DEFAULT_TIMEOUT, DEFAULT_CONNECT_TIMEOUT)
    }

    /// Create a client with custom timeouts
    pub fn with_config(
        endpoint: &Endpoint,
        timeout: Duration,
        connect_timeout: Duration,
    ) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(timeout)
            .connect_timeout(connect_timeout);

        if let Some(secret) = &endpoint.secret {
            let mut headers = reqwest::header::HeaderMap::new();
            let value = reqwest::header::HeaderValue::from_str(&format!("Bearer {}", secret))
                .map_err(|e| ClientError::Parse(format!("Invalid secret: {}", e)))?;
            headers.insert(reqwest::header::AUTHORIZATION, value);
            builder = builder.default_headers(headers);
        }

        Ok(Self {
            client: builder.build()?,
            base_url: endpoint.base_url()?,
            secret: endpoint.secret.clone(),
        })
    }

    /// Base URL of the control API
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The bearer secret, for transports that attach it themselves
    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }

    // =========================================================================
    // Config
    // =========================================================================

    /// Fetch the current daemon configuration
    #[instrument(skip(self))]
    pub async fn get_config(&self) -> Result<DaemonConfig> {
        let url = self.base_url.join("configs")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// Apply a partial configuration update
    #[instrument(skip(self, patch))]
    pub async fn patch_config(&self, patch: &ConfigPatch) -> Result<()> {
        let url = self.base_url.join("configs")?;
        let response = self.client.patch(url).json(patch).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    // =========================================================================
    // Version
    // =========================================================================

    /// Probe the daemon version
    ///
    /// Stream setup treats a failure here as "version unknown" and proceeds.
    #[instrument(skip(self))]
    pub async fn get_version(&self) -> Result<Version> {
        let url = self.base_url.join("version")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Rules
    // =========================================================================

    /// List routing rules in evaluation order
    #[instrument(skip(self))]
    pub async fn get_rules(&self) -> Result<RulesResponse> {
        let url = self.base_url.join("rules")?;
        debug!("Listing rules from {}", url);

        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Proxies
    // =========================================================================

    /// List all proxies and groups
    #[instrument(skip(self))]
    pub async fn get_proxies(&self) -> Result<ProxiesResponse> {
        let url = self.base_url.join("proxies")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// Get a single proxy or group by name
    #[instrument(skip(self))]
    pub async fn get_proxy(&self, name: &str) -> Result<Proxy> {
        let url = self
            .base_url
            .join(&format!("proxies/{}", encode_path_segment(name)))?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// Switch the selected member of a selector group
    #[instrument(skip(self))]
    pub async fn select_proxy(&self, group: &str, name: &str) -> Result<()> {
        let url = self
            .base_url
            .join(&format!("proxies/{}", encode_path_segment(group)))?;

        let request = SelectProxyRequest {
            name: name.to_string(),
        };
        let response = self.client.put(url).json(&request).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Measure a proxy's latency against the default probe target
    #[instrument(skip(self))]
    pub async fn test_delay(&self, name: &str, timeout_ms: u32) -> Result<DelayResponse> {
        self.test_delay_against(name, DEFAULT_DELAY_TEST_URL, timeout_ms)
            .await
    }

    /// Measure a proxy's latency against a custom probe target
    #[instrument(skip(self))]
    pub async fn test_delay_against(
        &self,
        name: &str,
        probe_url: &str,
        timeout_ms: u32,
    ) -> Result<DelayResponse> {
        let mut url = self
            .base_url
            .join(&format!("proxies/{}/delay", encode_path_segment(name)))?;
        url.query_pairs_mut()
            .append_pair("url", probe_url)
            .append_pair("timeout", &timeout_ms.to_string());

        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    // =========================================================================
    // Providers
    // =========================================================================

    /// List proxy providers
    #[instrument(skip(self))]
    pub async fn get_providers(&self) -> Result<ProvidersResponse> {
        let url = self.base_url.join("providers/proxies")?;
        let response = self.client.get(url).send().await?;
        self.handle_response(response).await
    }

    /// Trigger a provider refresh
    #[instrument(skip(self))]
    pub async fn update_provider(&self, name: &str) -> Result<()> {
        let url = self
            .base_url
            .join(&format!("providers/proxies/{}", encode_path_segment(name)))?;
        let response = self.client.put(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    // =========================================================================
    // Connections
    // =========================================================================

    /// Fetch a one-off snapshot of active connections
    ///
    /// The daemon serves the snapshot and the live feed on the same URL;
    /// the explicit `Accept` header requests the single-response form.
    #[instrument(skip(self))]
    pub async fn get_connections(&self) -> Result<ConnectionsSnapshot> {
        let url = self.base_url.join("connections")?;
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await?;
        self.handle_response(response).await
    }

    /// Close one connection by ID
    #[instrument(skip(self))]
    pub async fn close_connection(&self, id: &str) -> Result<()> {
        let url = self
            .base_url
            .join(&format!("connections/{}", encode_path_segment(id)))?;
        let response = self.client.delete(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Close all connections
    #[instrument(skip(self))]
    pub async fn close_all_connections(&self) -> Result<()> {
        let url = self.base_url.join("connections")?;
        let response = self.client.delete(url).send().await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(self.extract_error(response).await)
        }
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    /// Handle response and deserialize JSON
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();

        if status.is_success() {
            response
                .json()
                .await
                .map_err(|e| ClientError::Parse(e.to_string()))
        } else {
            Err(self.extract_error_from_status(response, status).await)
        }
    }

    /// Extract error from failed response
    async fn extract_error(&self, response: reqwest::Response) -> ClientError {
        let status = response.status();
        self.extract_error_from_status(response, status).await
    }

    async fn extract_error_from_status(
        &self,
        response: reqwest::Response,
        status: StatusCode,
    ) -> ClientError {
        #[derive(serde::Deserialize)]
        struct ErrorBody {
            message: String,
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.message,
            Err(_) => format!("HTTP {}", status),
        };

        ClientError::daemon_error(status.as_u16(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;

    fn endpoint() -> Endpoint {
        Endpoint {
            protocol: "http".into(),
            hostname: "127.0.0.1".into(),
            port: 9090,
            secret: Some("s3cret".into()),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = ControlClient::new(&endpoint());
        assert!(client.is_ok());
    }

    #[test]
    fn test_base_url_joins_relative_paths() {
        let client = ControlClient::new(&endpoint()).unwrap();
        let url = client.base_url().join("providers/proxies").unwrap();
        assert_eq!(url.as_str(), "http://127.0.0.1:9090/providers/proxies");
    }

    #[test]
    fn test_group_names_are_path_encoded() {
        assert_eq!(encode_path_segment("auto select"), "auto%20select");
        assert_eq!(encode_path_segment("a/b"), "a%2Fb");
    }
}
