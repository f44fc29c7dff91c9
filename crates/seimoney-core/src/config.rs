use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::link::DEFAULT_LINK_DOMAIN;

pub const DEFAULT_API_URL: &str = "http://localhost:3000";
pub const API_URL_ENV: &str = "SEIMONEY_API_URL";
pub const PROJECT_ID_ENV: &str = "SEIMONEY_PROJECT_ID";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct Config {
    pub api_url: Option<String>,
    /// Wallet-connect provider project id
    pub project_id: Option<String>,
    /// Last connected wallet, restored on startup
    pub wallet_address: Option<String>,
    pub link_domain: Option<String>,
    pub dark_mode: bool,
}

impl Config {
    pub fn new() -> Self {
        Self {
            dark_mode: true,
            ..Self::default()
        }
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::get_config_path()?)
    }

    pub fn load_from(config_path: &Path) -> Result<Self, ConfigError> {
        if !config_path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(config_path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::get_config_path()?)
    }

    pub fn save_to(&self, config_path: &Path) -> Result<(), ConfigError> {
        // Create config directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let config_content = serde_json::to_string_pretty(self)?;
        fs::write(config_path, config_content)?;
        Ok(())
    }

    /// Environment first, then the config file, then the default
    pub fn resolved_api_url(&self) -> String {
        std::env::var(API_URL_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_url.clone())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn resolved_project_id(&self) -> Option<String> {
        std::env::var(PROJECT_ID_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.project_id.clone())
    }

    pub fn resolved_link_domain(&self) -> String {
        self.link_domain
            .clone()
            .unwrap_or_else(|| DEFAULT_LINK_DOMAIN.to_string())
    }

    pub fn config_dir() -> Result<PathBuf, ConfigError> {
        let config_dir = dirs::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Ok(config_dir.join("seimoney"))
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::config_dir()?.join("config.json"))
    }
}
