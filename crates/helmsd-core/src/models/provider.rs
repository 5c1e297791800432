//! Proxy providers (externally sourced proxy sets)

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Proxy;

/// Response of `GET /providers/proxies`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersResponse {
    /// Providers keyed by name
    pub providers: HashMap<String, Provider>,
}

/// One proxy provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub name: String,
    /// Provider type ("Proxy")
    #[serde(rename = "type")]
    pub provider_type: String,
    /// How the provider is sourced ("HTTP", "File", "Compatible")
    pub vehicle_type: String,
    /// Proxies currently supplied by this provider
    #[serde(default)]
    pub proxies: Vec<Proxy>,
    /// Last successful refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_wire_shape() {
        let raw = r#"{"providers":{
            "main": {
                "name": "main",
                "type": "Proxy",
                "vehicleType": "HTTP",
                "proxies": [{"name":"jp-1","type":"Shadowsocks","history":[]}],
                "updatedAt": "2024-05-01T10:00:00Z"
            }
        }}"#;

        let providers: ProvidersResponse = serde_json::from_str(raw).unwrap();
        let main = &providers.providers["main"];
        assert_eq!(main.vehicle_type, "HTTP");
        assert_eq!(main.proxies.len(), 1);
    }
}
