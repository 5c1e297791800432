//! Live connection snapshots
//!
//! The `/connections` feed delivers one full point-in-time snapshot per wire
//! message; the REST endpoint of the same name returns a single snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Point-in-time view of all active connections plus aggregate counters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionsSnapshot {
    /// Total bytes downloaded since daemon start
    pub download_total: u64,
    /// Total bytes uploaded since daemon start
    pub upload_total: u64,
    /// Active connections, ordered by the daemon
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// One tracked connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Daemon-assigned connection ID
    pub id: String,
    /// Network/transport metadata
    pub metadata: ConnectionMetadata,
    /// Bytes uploaded on this connection
    pub upload: u64,
    /// Bytes downloaded on this connection
    pub download: u64,
    /// When the connection was established
    pub start: DateTime<Utc>,
    /// Proxy chain the connection traversed, outermost first
    pub chains: Vec<String>,
    /// Type of the rule that matched
    pub rule: String,
    /// Payload of the rule that matched
    #[serde(default)]
    pub rule_payload: String,
}

/// Addressing metadata for a connection
///
/// Ports are strings on the wire. The IP fields use the daemon's exact
/// casing (`sourceIP`, not `sourceIp`), so they are renamed individually.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionMetadata {
    /// L4 network ("tcp" or "udp")
    pub network: String,
    /// Inbound type that accepted the connection (e.g. "HTTPS", "Socks5")
    #[serde(rename = "type")]
    pub inbound: String,
    #[serde(rename = "sourceIP")]
    pub source_ip: String,
    #[serde(rename = "destinationIP", default)]
    pub destination_ip: String,
    pub source_port: String,
    pub destination_port: String,
    /// Target hostname when known (sniffed or from the request)
    #[serde(default)]
    pub host: String,
}
