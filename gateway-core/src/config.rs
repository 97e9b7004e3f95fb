//! Config schema shared by every filter, plus a minimal YAML loader.
//!
//! The surrounding gateway owns config loading and hot-reload wiring; this
//! module only defines the schema filters deserialize into and a thin
//! `serde_yaml` entry point the gateway can call.

use serde::Deserialize;
use std::collections::HashMap;

/// One configured filter instance, as the gateway's config file names it.
#[derive(Debug, Clone, Deserialize)]
pub struct Middleware {
    pub name: String,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default)]
    pub settings: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    Allow,
    Deny,
    RequireApproval,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Rule {
    pub action: Option<Action>,
    #[serde(default)]
    pub name_regex: Option<String>,
    #[serde(default)]
    pub argument_regex: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallPolicy {
    pub default_action: Action,
    #[serde(default)]
    pub rules: Vec<Rule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CircuitBreakerConfig {
    #[serde(default)]
    pub failure_rate_threshold: f64,
    pub consecutive_failures: u32,
    pub open_duration_ms: u64,
    #[serde(default = "default_half_open_requests")]
    pub half_open_requests: u32,
    #[serde(default = "default_min_samples")]
    pub minimum_samples: u32,
}

fn default_half_open_requests() -> u32 {
    1
}

fn default_min_samples() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    pub number_of_retries: u32,
    pub base_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResilienceConfig {
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerConfig>,
    #[serde(default)]
    pub retry_policy: Option<RetryConfig>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DlpConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub custom_patterns: Vec<String>,
}

#[derive(Debug)]
pub enum ConfigError {
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "config parse error: {msg}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse a YAML document into an ordered list of middleware configs.
/// Expects a top-level `middlewares:` sequence.
pub fn load_middlewares(yaml: &str) -> Result<Vec<Middleware>, ConfigError> {
    #[derive(Deserialize)]
    struct Doc {
        #[serde(default)]
        middlewares: Vec<Middleware>,
    }
    let doc: Doc = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse(e.to_string()))?;
    Ok(doc.middlewares)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_ordered_middlewares_from_yaml() {
        let yaml = r#"
middlewares:
  - name: rate_limit
    priority: 10
  - name: csrf
    priority: 5
    disabled: true
"#;
        let configs = load_middlewares(yaml).unwrap();
        assert_eq!(configs.len(), 2);
        assert_eq!(configs[0].name, "rate_limit");
        assert_eq!(configs[0].priority, 10);
        assert!(configs[1].disabled);
    }

    #[test]
    fn rejects_malformed_yaml() {
        let err = load_middlewares("middlewares: [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn call_policy_deserializes_rules_in_order() {
        let yaml = r#"
default_action: ALLOW
rules:
  - action: DENY
    name_regex: ".*test-tool"
"#;
        let policy: CallPolicy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(policy.default_action, Action::Allow);
        assert_eq!(policy.rules.len(), 1);
        assert_eq!(policy.rules[0].action, Some(Action::Deny));
    }
}
