//! Routing rules

use serde::{Deserialize, Serialize};

/// Response of `GET /rules`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RulesResponse {
    pub rules: Vec<Rule>,
}

/// One routing rule, in evaluation order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Matcher type (e.g. "DomainSuffix", "GeoIP", "Match")
    #[serde(rename = "type")]
    pub rule_type: String,
    /// Matcher payload; empty for catch-all rules
    #[serde(default)]
    pub payload: String,
    /// Proxy or group the rule routes to
    pub proxy: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn rules_wire_shape() {
        let raw = r#"{"rules":[
            {"type":"DomainSuffix","payload":"example.com","proxy":"relay"},
            {"type":"Match","payload":"","proxy":"DIRECT"}
        ]}"#;

        let rules: RulesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(rules.rules.len(), 2);
        assert_eq!(rules.rules[0].rule_type, "DomainSuffix");
        assert_eq!(rules.rules[1].proxy, "DIRECT");
    }
}
