//! Log feed records
//!
//! One record per wire message on the `/logs` feed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A single log line from the daemon's log feed
///
/// Wire shape: `{"type": "info", "payload": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    /// Severity of the line
    #[serde(rename = "type")]
    pub level: LogLevel,
    /// The log line itself
    pub payload: String,
}

/// Daemon log levels, ordered from most to least verbose
///
/// `silent` is a valid configuration value but never appears on the feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Debug-level messages
    Debug,
    /// Informational messages
    #[default]
    Info,
    /// Warning conditions
    Warning,
    /// Error conditions
    Error,
    /// Logging disabled
    Silent,
}

impl LogLevel {
    /// Wire name of the level, as used in the `?level=` query parameter
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Silent => "silent",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warning" | "warn" => Ok(Self::Warning),
            "error" => Ok(Self::Error),
            "silent" => Ok(Self::Silent),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn log_record_wire_shape() {
        let record: LogRecord =
            serde_json::from_str(r#"{"type":"warning","payload":"dns resolve failed"}"#).unwrap();
        assert_eq!(record.level, LogLevel::Warning);
        assert_eq!(record.payload, "dns resolve failed");

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["type"], "warning");
    }

    #[test]
    fn level_ordering_and_parse() {
        assert!(LogLevel::Debug < LogLevel::Error);
        assert_eq!("warn".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!("verbose".parse::<LogLevel>().is_err());
    }
}
