use std::fs;
use std::path::{Path, PathBuf};

use super::types::*;
use crate::error::{Error, Result};

const APP_DIR: &str = "lakeconn";
const CONFIG_FILE: &str = "config.toml";

pub struct ConfigStore {
    config_dir: PathBuf,
    config_path: PathBuf,
}

impl ConfigStore {
    /// Store under the platform config directory.
    pub fn new() -> Result<Self> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("could not determine config directory".into()))?
            .join(APP_DIR);
        Ok(Self::at(config_dir))
    }

    pub fn at(config_dir: impl Into<PathBuf>) -> Self {
        let config_dir = config_dir.into();
        Self {
            config_path: config_dir.join(CONFIG_FILE),
            config_dir,
        }
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn load_config(&self) -> Result<Config> {
        if !self.config_path.exists() {
            return Ok(Config::default());
        }
        let contents = fs::read_to_string(&self.config_path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    pub fn save_config(&self, config: &Config) -> Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        let contents = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, contents)?;
        Ok(())
    }

    // -- High-level operations ------------------------------------------------

    /// Endpoint to talk to. `explicit` comes from the command line or the
    /// environment and wins over the file.
    pub fn resolve_endpoint(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(endpoint) = explicit.filter(|e| !e.trim().is_empty()) {
            return Ok(endpoint.to_string());
        }
        let config = self.load_config()?;
        Ok(config
            .endpoint
            .filter(|e| !e.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()))
    }

    pub fn set_endpoint(&self, endpoint: &str) -> Result<()> {
        url::Url::parse(endpoint)?;
        let mut config = self.load_config()?;
        config.endpoint = Some(endpoint.to_string());
        self.save_config(&config)
    }

    pub fn set_connection_limit(&self, provider: &str, limit: Option<usize>) -> Result<()> {
        crate::provider::get_provider(provider)?;
        let mut config = self.load_config()?;
        match limit {
            Some(limit) => {
                config
                    .providers
                    .entry(provider.to_string())
                    .or_default()
                    .connection_limit = Some(limit);
            }
            None => {
                config.providers.remove(provider);
            }
        }
        self.save_config(&config)
    }
}
