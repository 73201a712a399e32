/// Application configuration management
/// Stores user defaults in ~/.config/dvm-cli/config.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::utils::APP_NAME;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Image used to run the archive command
    pub base_image: Option<String>,
    /// Mount point of the volume inside the ephemeral container
    pub mount_path: Option<String>,
    /// Archive location inside the container root
    pub archive_path: Option<String>,
    /// Registry namespace used when restoring
    pub namespace: Option<String>,
    /// Step timeout, e.g. "10m" or "1h 30m"
    pub step_timeout: Option<String>,
}

impl AppConfig {
    /// Get config file path
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not determine the user config directory")?;
        Ok(config_dir.join(APP_NAME).join("config.toml"))
    }

    /// Load configuration from the default location; a missing file yields defaults
    pub fn load() -> Result<Self> {
        Self::load_from(Self::config_path()?)
    }

    /// Load configuration from a specific file
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(config)
    }

    /// Parsed step timeout, if one is configured
    pub fn step_timeout(&self) -> Result<Option<Duration>> {
        self.step_timeout
            .as_deref()
            .map(|raw| {
                humantime::parse_duration(raw)
                    .with_context(|| format!("Invalid step_timeout '{}'", raw))
            })
            .transpose()
    }
}
