//! Daemon version probe

use serde::{Deserialize, Serialize};

/// Response of `GET /version`
///
/// The probe is best-effort: stream setup treats a failed probe as
/// "version unknown" and continues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Version {
    pub version: String,
    /// Present on premium daemon builds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_wire_shape() {
        let version: Version = serde_json::from_str(r#"{"version":"1.9.0"}"#).unwrap();
        assert_eq!(version.version, "1.9.0");
        assert!(version.premium.is_none());

        let premium: Version =
            serde_json::from_str(r#"{"version":"2024.01","premium":true}"#).unwrap();
        assert_eq!(premium.premium, Some(true));
    }
}
