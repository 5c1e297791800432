//! Daemon runtime configuration
//!
//! The config endpoint uses kebab-case keys on the wire.

use serde::{Deserialize, Serialize};

use super::LogLevel;

/// Current daemon configuration as returned by `GET /configs`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct DaemonConfig {
    /// HTTP proxy listen port (0 when disabled)
    #[serde(default)]
    pub port: u16,
    /// SOCKS5 proxy listen port
    #[serde(default)]
    pub socks_port: u16,
    /// Transparent redirect port
    #[serde(default)]
    pub redir_port: u16,
    /// Combined HTTP/SOCKS listen port
    #[serde(default)]
    pub mixed_port: u16,
    /// Whether LAN clients may connect
    #[serde(default)]
    pub allow_lan: bool,
    /// Listen address when `allow_lan` is set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bind_address: Option<String>,
    /// Routing mode ("rule", "global", "direct")
    #[serde(default)]
    pub mode: String,
    /// Active log level; parameterizes the log feed URL
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Partial configuration update for `PATCH /configs`
///
/// Only present fields are applied by the daemon.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ConfigPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub socks_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mixed_port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allow_lan: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn config_wire_shape() {
        let raw = r#"{
            "port": 7890,
            "socks-port": 7891,
            "redir-port": 0,
            "mixed-port": 0,
            "allow-lan": false,
            "mode": "rule",
            "log-level": "warning"
        }"#;

        let config: DaemonConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.port, 7890);
        assert_eq!(config.socks_port, 7891);
        assert_eq!(config.log_level, LogLevel::Warning);
        assert_eq!(config.mode, "rule");
    }

    #[test]
    fn patch_serializes_only_present_fields() {
        let patch = ConfigPatch {
            log_level: Some(LogLevel::Debug),
            ..Default::default()
        };
        let json = serde_json::to_value(&patch).unwrap();
        assert_eq!(json, serde_json::json!({"log-level": "debug"}));
    }
}
