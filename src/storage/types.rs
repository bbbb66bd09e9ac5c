use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::provider;

/// Backend used when neither the command line nor the config names one.
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080";

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Top-level config file. Stored as config.toml.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub endpoint: Option<String>,
    pub timeout_secs: Option<u64>,
    /// Batch-test fan-out; unset tests every connection at once.
    pub test_concurrency: Option<usize>,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

/// Per-provider config section.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub connection_limit: Option<usize>,
}

impl Config {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    /// Built-in limits with the configured ones laid over them.
    pub fn connection_limits(&self) -> HashMap<String, usize> {
        let mut limits = provider::default_connection_limits();
        for (name, section) in &self.providers {
            if let Some(limit) = section.connection_limit {
                limits.insert(name.clone(), limit);
            }
        }
        limits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_full_file() {
        let config: Config = toml::from_str(
            r#"
            endpoint = "https://lake.example.test"
            timeout_secs = 5
            test_concurrency = 4

            [providers.github]
            connection_limit = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.endpoint.as_deref(), Some("https://lake.example.test"));
        assert_eq!(config.timeout(), Duration::from_secs(5));
        assert_eq!(config.test_concurrency, Some(4));

        let limits = config.connection_limits();
        assert_eq!(limits.get("github"), Some(&3));
        assert_eq!(limits.get("jenkins"), Some(&1));
        assert_eq!(limits.get("jira"), None);
    }

    #[test]
    fn configured_limit_replaces_builtin() {
        let mut config = Config::default();
        config.providers.insert(
            "jenkins".into(),
            ProviderConfig {
                connection_limit: Some(2),
            },
        );
        assert_eq!(config.connection_limits().get("jenkins"), Some(&2));
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.timeout(), Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }
}
