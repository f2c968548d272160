use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{SdkError, SdkResult};
use crate::logging::LoggingConfig;

/// Version assumed for hosts that report none during the handshake.
pub const DEFAULT_HOST_VERSION: &str = "2.0.1";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SdkConfig {
    pub compat: CompatConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompatConfig {
    /// Highest supported version assumed when a legacy host reports none.
    pub default_host_version: String,
}

#[allow(clippy::derivable_impls)]
impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            compat: CompatConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for CompatConfig {
    fn default() -> Self {
        Self {
            default_host_version: DEFAULT_HOST_VERSION.to_string(),
        }
    }
}

impl SdkConfig {
    /// Get the config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| {
                dirs::home_dir()
                    .map(|h| h.join(".config"))
                    .unwrap_or_else(|| PathBuf::from("/tmp"))
            })
            .join("hostlink")
            .join("config.toml")
    }

    /// Load config from the default path, or return defaults if missing or unreadable
    pub fn load() -> Self {
        let path = Self::config_path();
        if !path.exists() {
            return Self::default();
        }

        match Self::load_from(&path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to load config, using defaults");
                Self::default()
            }
        }
    }

    /// Load config from a specific file
    pub fn load_from(path: &Path) -> SdkResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse config from TOML text
    pub fn from_toml(content: &str) -> SdkResult<Self> {
        let mut config: Self = toml::from_str(content)?;
        config.validate();
        Ok(config)
    }

    /// Normalize values that would otherwise break synthesis or logging
    fn validate(&mut self) {
        if self.compat.default_host_version.trim().is_empty() {
            self.compat.default_host_version = DEFAULT_HOST_VERSION.to_string();
        }
        self.logging.level = self.logging.level.trim().to_lowercase();
        if self.logging.level.is_empty() {
            self.logging.level = LoggingConfig::default().level;
        }
    }

    /// Save config to a file, creating parent directories
    pub fn save_to(&self, path: &Path) -> SdkResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| SdkError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, content)?;
        Ok(())
    }
}
