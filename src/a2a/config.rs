//! Remote agent endpoint configuration.
//!
//! Endpoints are loaded once (from YAML or from the environment) and are
//! immutable afterwards. Every field except the base address has a default.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::a2a::auth::{AuthConfig, BearerTokenAuth};
use crate::a2a::types::{AgentSkill, DEFAULT_PROTOCOL_VERSION};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("environment variable {0} is not set")]
    MissingVar(String),

    #[error("invalid value {value:?} for {key}: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid base address {address:?}: {reason}")]
    InvalidAddress { address: String, reason: String },

    #[error("duplicate endpoint name '{0}'")]
    DuplicateEndpoint(String),
}

// ---------------------------------------------------------------------------
// Timeout policy
// ---------------------------------------------------------------------------

/// Bounded exponential backoff between retry attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackoffPolicy {
    /// Delay before the first retry, in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_ms: u64,
    /// Upper bound on any single delay, in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_ms: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
}

fn default_initial_backoff_ms() -> u64 { 200 }
fn default_max_backoff_ms() -> u64 { 5_000 }
fn default_multiplier() -> f64 { 2.0 }

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial_ms: default_initial_backoff_ms(),
            max_ms: default_max_backoff_ms(),
            multiplier: default_multiplier(),
        }
    }
}

impl BackoffPolicy {
    /// No delay between attempts.
    pub fn none() -> Self {
        Self {
            initial_ms: 0,
            max_ms: 0,
            multiplier: 1.0,
        }
    }

    /// Delay before retry number `retry` (0-based).
    pub fn delay(&self, retry: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(retry.min(32) as i32);
        let ms = (self.initial_ms as f64 * factor).min(self.max_ms as f64);
        Duration::from_millis(ms as u64)
    }
}

/// How long a call may take and how often it is retried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeoutPolicy {
    /// Deadline for the whole call including retries, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries after the first attempt for retryable transport failures.
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default)]
    pub backoff: BackoffPolicy,
}

fn default_timeout_ms() -> u64 { 30_000 }
fn default_retry_count() -> u32 { 3 }

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            retry_count: default_retry_count(),
            backoff: BackoffPolicy::default(),
        }
    }
}

impl TimeoutPolicy {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Total attempts a retryable failure may consume.
    pub fn max_attempts(&self) -> u32 {
        self.retry_count.saturating_add(1)
    }
}

// ---------------------------------------------------------------------------
// Endpoint
// ---------------------------------------------------------------------------

/// A remote agent the bridge talks to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteAgentEndpoint {
    /// Label used in logs; defaults to the base address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Base URI of the remote agent, e.g. `http://localhost:8001`.
    pub base_address: String,
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    #[serde(default)]
    pub timeout_policy: TimeoutPolicy,
    #[serde(default = "default_card_path")]
    pub card_path: String,
    #[serde(default = "default_rpc_path")]
    pub rpc_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,
    /// Use `message/stream` for capabilities that advertise streaming.
    #[serde(default)]
    pub streaming: bool,
    /// Capabilities to use instead of fetching the agent card.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub static_capabilities: Option<Vec<AgentSkill>>,
}

fn default_protocol_version() -> String { DEFAULT_PROTOCOL_VERSION.to_string() }
fn default_card_path() -> String { "/.well-known/agent-card.json".to_string() }
fn default_rpc_path() -> String { "/a2a".to_string() }

impl RemoteAgentEndpoint {
    pub fn new(base_address: impl Into<String>) -> Self {
        Self {
            name: None,
            base_address: base_address.into(),
            protocol_version: default_protocol_version(),
            timeout_policy: TimeoutPolicy::default(),
            card_path: default_card_path(),
            rpc_path: default_rpc_path(),
            auth: None,
            streaming: false,
            static_capabilities: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_policy.timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_retry_count(mut self, retry_count: u32) -> Self {
        self.timeout_policy.retry_count = retry_count;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.timeout_policy.backoff = backoff;
        self
    }

    pub fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.protocol_version = version.into();
        self
    }

    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    pub fn with_streaming(mut self, streaming: bool) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn with_static_capabilities(mut self, skills: Vec<AgentSkill>) -> Self {
        self.static_capabilities = Some(skills);
        self
    }

    /// Name for logs and error messages.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.base_address)
    }

    pub fn card_url(&self) -> String {
        join_url(&self.base_address, &self.card_path)
    }

    pub fn rpc_url(&self) -> String {
        join_url(&self.base_address, &self.rpc_path)
    }

    /// Check that the base address is an absolute http(s) URL and the
    /// policy is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.base_address).map_err(|e| {
            ConfigError::InvalidAddress {
                address: self.base_address.clone(),
                reason: e.to_string(),
            }
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidAddress {
                address: self.base_address.clone(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }
        if self.timeout_policy.timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "timeout_policy.timeout_ms".to_string(),
                value: "0".to_string(),
                reason: "timeout must be positive".to_string(),
            });
        }
        Ok(())
    }

    /// Load an endpoint from `<PREFIX>_URL`, `<PREFIX>_TIMEOUT_SECS`,
    /// `<PREFIX>_RETRY_COUNT`, `<PREFIX>_PROTOCOL_VERSION` and
    /// `<PREFIX>_BEARER_TOKEN`. Only the URL is required.
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(prefix, |key| std::env::var(key).ok())
    }

    fn from_lookup(
        prefix: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let url_key = format!("{}_URL", prefix);
        let url = lookup(&url_key).ok_or(ConfigError::MissingVar(url_key))?;
        let mut endpoint = Self::new(url).with_name(prefix.to_lowercase());

        let timeout_key = format!("{}_TIMEOUT_SECS", prefix);
        if let Some(raw) = lookup(&timeout_key) {
            let secs: f64 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: timeout_key.clone(),
                value: raw.clone(),
                reason: "expected a number of seconds".to_string(),
            })?;
            if !secs.is_finite() || secs <= 0.0 {
                return Err(ConfigError::InvalidValue {
                    key: timeout_key,
                    value: raw,
                    reason: "timeout must be positive".to_string(),
                });
            }
            let timeout = Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidValue {
                key: timeout_key.clone(),
                value: raw.clone(),
                reason: e.to_string(),
            })?;
            endpoint = endpoint.with_timeout(timeout);
        }

        let retry_key = format!("{}_RETRY_COUNT", prefix);
        if let Some(raw) = lookup(&retry_key) {
            let count: u32 = raw.parse().map_err(|_| ConfigError::InvalidValue {
                key: retry_key,
                value: raw.clone(),
                reason: "expected a non-negative integer".to_string(),
            })?;
            endpoint = endpoint.with_retry_count(count);
        }

        if let Some(version) = lookup(&format!("{}_PROTOCOL_VERSION", prefix)) {
            endpoint = endpoint.with_protocol_version(version);
        }

        if let Some(token) = lookup(&format!("{}_BEARER_TOKEN", prefix)) {
            endpoint = endpoint.with_auth(AuthConfig::Bearer(BearerTokenAuth { token }));
        }

        endpoint.validate()?;
        Ok(endpoint)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

// ---------------------------------------------------------------------------
// Bridge config
// ---------------------------------------------------------------------------

/// Top-level configuration: the set of remote agents to bridge.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    #[serde(default)]
    pub remote_agents: Vec<RemoteAgentEndpoint>,
}

impl BridgeConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();
        for endpoint in &self.remote_agents {
            endpoint.validate()?;
            if !seen.insert(endpoint.display_name()) {
                return Err(ConfigError::DuplicateEndpoint(
                    endpoint.display_name().to_string(),
                ));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_endpoint_defaults() {
        let endpoint = RemoteAgentEndpoint::new("http://localhost:8001/");
        assert_eq!(endpoint.timeout_policy.timeout(), Duration::from_secs(30));
        assert_eq!(endpoint.timeout_policy.max_attempts(), 4);
        assert_eq!(endpoint.protocol_version, "0.3.0");
        assert_eq!(
            endpoint.card_url(),
            "http://localhost:8001/.well-known/agent-card.json"
        );
        assert_eq!(endpoint.rpc_url(), "http://localhost:8001/a2a");
        assert!(endpoint.validate().is_ok());
    }

    #[test]
    fn test_backoff_is_bounded() {
        let backoff = BackoffPolicy::default();
        assert_eq!(backoff.delay(0), Duration::from_millis(200));
        assert_eq!(backoff.delay(1), Duration::from_millis(400));
        assert_eq!(backoff.delay(2), Duration::from_millis(800));
        assert_eq!(backoff.delay(10), Duration::from_millis(5_000));
        assert_eq!(BackoffPolicy::none().delay(3), Duration::ZERO);
    }

    #[test]
    fn test_rejects_bad_addresses() {
        for address in ["not a url", "ftp://host/agent"] {
            let err = RemoteAgentEndpoint::new(address).validate().unwrap_err();
            assert!(matches!(err, ConfigError::InvalidAddress { .. }), "{}", address);
        }
    }

    #[test]
    fn test_yaml_config() {
        let config = BridgeConfig::from_yaml_str(
            r#"
remote_agents:
  - name: currency
    base_address: http://localhost:8001
    timeout_policy:
      timeout_ms: 5000
      retry_count: 1
    auth:
      type: bearer
      token: abc
  - base_address: http://localhost:8002
    static_capabilities:
      - id: ping
        inputSchema: {type: object}
        outputSchema: {type: string}
"#,
        )
        .unwrap();

        assert_eq!(config.remote_agents.len(), 2);
        let currency = &config.remote_agents[0];
        assert_eq!(currency.display_name(), "currency");
        assert_eq!(currency.timeout_policy.timeout_ms, 5000);
        assert_eq!(currency.timeout_policy.retry_count, 1);
        assert_eq!(currency.timeout_policy.backoff, BackoffPolicy::default());
        assert!(matches!(currency.auth, Some(AuthConfig::Bearer(_))));

        let statics = config.remote_agents[1].static_capabilities.as_ref().unwrap();
        assert_eq!(statics[0].id.as_deref(), Some("ping"));
    }

    #[test]
    fn test_yaml_rejects_duplicate_names() {
        let err = BridgeConfig::from_yaml_str(
            "remote_agents:\n  - {name: a, base_address: 'http://x'}\n  - {name: a, base_address: 'http://y'}\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateEndpoint(name) if name == "a"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "remote_agents:\n  - base_address: https://agents.example.com").unwrap();
        let config = BridgeConfig::from_file(file.path()).unwrap();
        assert_eq!(config.remote_agents[0].base_address, "https://agents.example.com");

        let missing = BridgeConfig::from_file("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(missing, ConfigError::Io { .. }));
    }

    #[test]
    fn test_from_env_lookup() {
        let vars: HashMap<&str, &str> = [
            ("CURRENCY_AGENT_URL", "http://localhost:8001"),
            ("CURRENCY_AGENT_TIMEOUT_SECS", "2.5"),
            ("CURRENCY_AGENT_RETRY_COUNT", "0"),
            ("CURRENCY_AGENT_BEARER_TOKEN", "tok"),
        ]
        .into_iter()
        .collect();
        let endpoint = RemoteAgentEndpoint::from_lookup("CURRENCY_AGENT", |k| {
            vars.get(k).map(|v| v.to_string())
        })
        .unwrap();

        assert_eq!(endpoint.display_name(), "currency_agent");
        assert_eq!(endpoint.timeout_policy.timeout_ms, 2500);
        assert_eq!(endpoint.timeout_policy.retry_count, 0);
        assert!(matches!(endpoint.auth, Some(AuthConfig::Bearer(ref b)) if b.token == "tok"));
    }

    #[test]
    fn test_from_env_errors() {
        let missing = RemoteAgentEndpoint::from_lookup("NOPE", |_| None).unwrap_err();
        assert!(matches!(missing, ConfigError::MissingVar(ref k) if k == "NOPE_URL"));

        let bad = RemoteAgentEndpoint::from_lookup("X", |k| match k {
            "X_URL" => Some("http://localhost".to_string()),
            "X_RETRY_COUNT" => Some("many".to_string()),
            _ => None,
        })
        .unwrap_err();
        assert!(matches!(bad, ConfigError::InvalidValue { ref key, .. } if key == "X_RETRY_COUNT"));

        for raw in ["1e300", "-1", "inf", "soon"] {
            let err = RemoteAgentEndpoint::from_lookup("X", |k| match k {
                "X_URL" => Some("http://localhost".to_string()),
                "X_TIMEOUT_SECS" => Some(raw.to_string()),
                _ => None,
            })
            .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "X_TIMEOUT_SECS"),
                "{} was accepted",
                raw
            );
        }
    }
}
