//! # Runtime Configuration
//!
//! Configuration for the services hosted by the node runtime.
//!
//! Values come from, in increasing precedence:
//!
//! 1. Built-in defaults
//! 2. A JSON file named by `SR_CONFIG_FILE` (missing keys keep defaults)
//! 3. Environment overrides (`SR_DEFAULT_TIMEOUT_MS`, `SR_INBOUND_CAPACITY`,
//!    `SR_SCRIPT_TIMER_MS`, `SR_DEMO_REQUEST`)

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable naming the JSON config file.
pub const CONFIG_FILE_ENV: &str = "SR_CONFIG_FILE";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidOverride { key: &'static str, value: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Complete runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Timeout applied to outbound calls that do not pick their own.
    pub default_timeout_ms: u64,
    /// Per-peer inbound queue capacity of the in-memory network.
    pub inbound_capacity: usize,
    /// Service names.
    pub services: ServiceNames,
    /// Delay of the script service's startup timer.
    pub script_timer_ms: u64,
    /// Send one request through the script service after startup.
    pub demo_request: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 10_000,
            inbound_capacity: 1024,
            services: ServiceNames::default(),
            script_timer_ms: 2_000,
            demo_request: true,
        }
    }
}

/// Names under which the demo services attach to the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceNames {
    pub test: String,
    pub script: String,
    /// Peer used by the runtime itself to issue calls.
    pub console: String,
}

impl Default for ServiceNames {
    fn default() -> Self {
        Self {
            test: "TestService".to_string(),
            script: "ScriptService".to_string(),
            console: "Console".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Load from `SR_CONFIG_FILE` (if set) and environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Like [`load`](Self::load), reading variables through `lookup`.
    pub fn load_with(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = match lookup(CONFIG_FILE_ENV) {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(lookup)?;
        Ok(config)
    }

    /// Read a JSON config file. Keys absent from the file keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(value) = lookup("SR_DEFAULT_TIMEOUT_MS") {
            self.default_timeout_ms = parse_override("SR_DEFAULT_TIMEOUT_MS", value)?;
        }
        if let Some(value) = lookup("SR_INBOUND_CAPACITY") {
            self.inbound_capacity = parse_override("SR_INBOUND_CAPACITY", value)?;
        }
        if let Some(value) = lookup("SR_SCRIPT_TIMER_MS") {
            self.script_timer_ms = parse_override("SR_SCRIPT_TIMER_MS", value)?;
        }
        if let Some(value) = lookup("SR_DEMO_REQUEST") {
            self.demo_request = parse_override("SR_DEMO_REQUEST", value)?;
        }
        Ok(())
    }

    /// Reject configurations the runtime cannot start with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "default_timeout_ms must be greater than zero".into(),
            ));
        }
        if self.inbound_capacity == 0 {
            return Err(ConfigError::Invalid(
                "inbound_capacity must be greater than zero".into(),
            ));
        }

        let names = [
            &self.services.test,
            &self.services.script,
            &self.services.console,
        ];
        if names.iter().any(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid("service names must not be empty".into()));
        }
        for (i, name) in names.iter().enumerate() {
            if names[i + 1..].contains(name) {
                return Err(ConfigError::Invalid(format!(
                    "service name {name} is used twice"
                )));
            }
        }
        Ok(())
    }

    pub fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub fn script_timer(&self) -> Duration {
        Duration::from_millis(self.script_timer_ms)
    }
}

fn parse_override<T: std::str::FromStr>(key: &'static str, value: String) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidOverride { key, value })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    fn temp_config(contents: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = RuntimeConfig::load_with(lookup(&[])).unwrap();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.default_timeout(), Duration::from_secs(10));
        assert_eq!(config.services.test, "TestService");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_overrides() {
        let config = RuntimeConfig::load_with(lookup(&[
            ("SR_DEFAULT_TIMEOUT_MS", "250"),
            ("SR_INBOUND_CAPACITY", "8"),
            ("SR_DEMO_REQUEST", "false"),
        ]))
        .unwrap();

        assert_eq!(config.default_timeout(), Duration::from_millis(250));
        assert_eq!(config.inbound_capacity, 8);
        assert!(!config.demo_request);
        assert_eq!(config.script_timer_ms, 2_000);
    }

    #[test]
    fn test_bad_override_is_rejected() {
        let err = RuntimeConfig::load_with(lookup(&[("SR_INBOUND_CAPACITY", "lots")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidOverride {
                key: "SR_INBOUND_CAPACITY",
                ..
            }
        ));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = temp_config(r#"{"default_timeout_ms": 500, "services": {"test": "Db"}}"#);
        let config = RuntimeConfig::load_with(lookup(&[
            (CONFIG_FILE_ENV, file.path().to_str().unwrap()),
            ("SR_DEFAULT_TIMEOUT_MS", "750"),
        ]))
        .unwrap();

        // Env wins over the file.
        assert_eq!(config.default_timeout_ms, 750);
        assert_eq!(config.services.test, "Db");
        assert_eq!(config.services.script, "ScriptService");
        assert_eq!(config.inbound_capacity, 1024);
    }

    #[test]
    fn test_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let err = RuntimeConfig::from_file(dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));

        let file = temp_config("{ not json");
        let err = RuntimeConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_validate() {
        let mut config = RuntimeConfig {
            default_timeout_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.default_timeout_ms = 1;
        config.inbound_capacity = 0;
        assert!(config.validate().is_err());

        config.inbound_capacity = 1;
        config.services.script = "TestService".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("used twice"));

        config.services.script = " ".into();
        assert!(config.validate().is_err());
    }
}
