//! Proxies and proxy groups

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response of `GET /proxies`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProxiesResponse {
    /// All proxies and groups, keyed by name
    pub proxies: HashMap<String, Proxy>,
}

/// A proxy node or selector group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Proxy {
    pub name: String,
    /// Proxy type (e.g. "Shadowsocks", "Selector", "URLTest", "Direct")
    #[serde(rename = "type")]
    pub proxy_type: String,
    /// Recent latency probes, oldest first
    #[serde(default)]
    pub history: Vec<DelayProbe>,
    /// Member names; present for groups only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub all: Option<Vec<String>>,
    /// Currently selected member; present for selector groups only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub now: Option<String>,
    /// Whether the proxy relays UDP
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub udp: Option<bool>,
}

impl Proxy {
    /// True for group types that contain other proxies
    pub fn is_group(&self) -> bool {
        self.all.is_some()
    }
}

/// One latency measurement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayProbe {
    pub time: DateTime<Utc>,
    /// Round-trip in milliseconds; 0 means the probe failed
    pub delay: u32,
}

/// Body of `PUT /proxies/<group>` to switch the selected member
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectProxyRequest {
    pub name: String,
}

/// Response of `GET /proxies/<name>/delay`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DelayResponse {
    /// Measured round-trip in milliseconds
    pub delay: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn proxy_group_wire_shape() {
        let raw = r#"{
            "name": "auto",
            "type": "URLTest",
            "history": [{"time": "2024-05-01T10:00:00Z", "delay": 86}],
            "all": ["jp-1", "us-2"],
            "now": "jp-1"
        }"#;

        let proxy: Proxy = serde_json::from_str(raw).unwrap();
        assert!(proxy.is_group());
        assert_eq!(proxy.now.as_deref(), Some("jp-1"));
        assert_eq!(proxy.history[0].delay, 86);
    }

    #[test]
    fn plain_node_has_no_members() {
        let proxy: Proxy =
            serde_json::from_str(r#"{"name":"DIRECT","type":"Direct","history":[]}"#).unwrap();
        assert!(!proxy.is_group());
        assert!(proxy.now.is_none());
    }
}
