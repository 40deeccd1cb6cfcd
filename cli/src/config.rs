// Configuration management for the Myatri CLI
//
// Cross-platform config stored in:
// - macOS: ~/Library/Application Support/myatri/config.json
// - Linux: ~/.config/myatri/config.json
// - Windows: %APPDATA%\myatri\config.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory of the durable store (defaults to the platform data dir)
    #[serde(default)]
    pub storage_path: Option<String>,

    /// Delay of the simulated bus listing fetch, in milliseconds
    #[serde(default = "Config::default_bus_fetch_delay_ms")]
    pub bus_fetch_delay_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: None,
            bus_fetch_delay_ms: Self::default_bus_fetch_delay_ms(),
        }
    }
}

impl Config {
    fn default_bus_fetch_delay_ms() -> u64 {
        500
    }

    /// Get the config directory path (cross-platform)
    pub fn config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to determine config directory")?
            .join("myatri");

        std::fs::create_dir_all(&config_dir).context("Failed to create config directory")?;

        Ok(config_dir)
    }

    /// Get the data directory path (cross-platform)
    pub fn data_dir() -> Result<PathBuf> {
        let data_dir = dirs::data_local_dir()
            .context("Failed to determine data directory")?
            .join("myatri");

        std::fs::create_dir_all(&data_dir).context("Failed to create data directory")?;

        Ok(data_dir)
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.json"))
    }

    /// Load config from the platform location, creating it if missing
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path).context("Failed to read config file")?;
            let config: Config =
                serde_json::from_str(&contents).context("Failed to parse config file")?;
            Ok(config)
        } else {
            let config = Config::default();
            config.save_to(path)?;
            Ok(config)
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_file()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, contents).context("Failed to write config file")?;
        Ok(())
    }

    /// Where the durable store lives
    pub fn storage_dir(&self) -> Result<PathBuf> {
        match &self.storage_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(Self::data_dir()?.join("storage")),
        }
    }

    pub fn bus_fetch_delay(&self) -> Duration {
        Duration::from_millis(self.bus_fetch_delay_ms)
    }

    /// Set a config value in memory; callers persist with `save`
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        match key {
            "storage_path" => {
                self.storage_path = if value.is_empty() {
                    None
                } else {
                    Some(value.to_string())
                };
            }
            "bus_fetch_delay_ms" => {
                self.bus_fetch_delay_ms = value.parse().context("Invalid number")?;
            }
            _ => anyhow::bail!("Unknown config key: {}", key),
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match key {
            "storage_path" => self.storage_path.clone(),
            "bus_fetch_delay_ms" => Some(self.bus_fetch_delay_ms.to_string()),
            _ => None,
        }
    }

    pub fn list(&self) -> Vec<(String, String)> {
        vec![
            (
                "storage_path".to_string(),
                self.storage_path
                    .clone()
                    .unwrap_or_else(|| "(auto)".to_string()),
            ),
            (
                "bus_fetch_delay_ms".to_string(),
                self.bus_fetch_delay_ms.to_string(),
            ),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.storage_path, None);
        assert_eq!(config.bus_fetch_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.bus_fetch_delay_ms, 500);
    }

    #[test]
    fn test_set_and_get() {
        let mut config = Config::default();
        config.set("bus_fetch_delay_ms", "0").unwrap();
        config.set("storage_path", "/tmp/myatri").unwrap();

        assert_eq!(config.get("bus_fetch_delay_ms").as_deref(), Some("0"));
        assert_eq!(config.storage_dir().unwrap(), PathBuf::from("/tmp/myatri"));
        assert!(config.set("listen_port", "1").is_err());
        assert!(config.set("bus_fetch_delay_ms", "soon").is_err());

        config.set("storage_path", "").unwrap();
        assert_eq!(config.get("storage_path"), None);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.bus_fetch_delay_ms, 500);

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.bus_fetch_delay_ms, config.bus_fetch_delay_ms);
    }
}
