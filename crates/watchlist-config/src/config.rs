use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub remote: Option<RemoteConfig>,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Hosted table that mirrors the watchlist for signed-in users.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    pub url: String,
    pub api_key: String,
    #[serde(default = "default_table")]
    pub table: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_table() -> String {
    "watchlist".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

impl RemoteConfig {
    pub fn new(url: String, api_key: String) -> Self {
        Self {
            url,
            api_key,
            table: default_table(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config file, or fall back to defaults (guest-only mode) when it does not exist.
    pub fn load_or_default(path: &PathBuf) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from_file(path)
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(remote) = &self.remote {
            if remote.url.is_empty() || remote.url == "YOUR_PROJECT_URL" {
                return Err(anyhow::anyhow!("remote.url is not configured"));
            }
            if !remote.url.starts_with("http://") && !remote.url.starts_with("https://") {
                return Err(anyhow::anyhow!("remote.url must start with http:// or https://"));
            }
            if remote.api_key.is_empty() || remote.api_key == "YOUR_API_KEY" {
                return Err(anyhow::anyhow!("remote.api_key is not configured"));
            }
            if remote.table.is_empty() {
                return Err(anyhow::anyhow!("remote.table cannot be empty"));
            }
            if remote.timeout_seconds == 0 {
                return Err(anyhow::anyhow!("remote.timeout_seconds must be greater than zero"));
            }
        }
        Ok(())
    }

    pub fn is_remote_configured(&self) -> bool {
        self.remote.is_some() && self.validate().is_ok()
    }
}
