//! Engine configuration loading and validation

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::{EngineConfig, RefreshConfig};
use crate::error::{AuthzError, Result};

/// Complete RBAC configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RbacConfig {
    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub logging: LoggingSection,

    #[serde(default)]
    pub store: StoreSection,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheSection {
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: u64,
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_ms: u64,
    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingSection {
    #[serde(default = "default_log_level")]
    pub level: String,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreSection {
    /// Seed file for the in-memory store, relative to the config file
    #[serde(default)]
    pub seed: Option<PathBuf>,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            refresh_interval_ms: default_refresh_interval(),
            fetch_timeout_ms: default_fetch_timeout(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// Default value functions
fn default_refresh_interval() -> u64 { 2000 }
fn default_fetch_timeout() -> u64 { 1000 }
fn default_max_backoff() -> u64 { 30_000 }
fn default_log_level() -> String { "info".to_string() }

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl RbacConfig {
    /// Parse configuration from TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| AuthzError::Config(format!("Failed to parse configuration: {}", e)))
    }

    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            AuthzError::Config(format!(
                "Failed to read configuration file {}: {}",
                path.display(),
                e
            ))
        })?;

        let mut config = Self::from_toml(&contents)?;

        if let (Some(seed), Some(dir)) = (config.store.seed.as_ref(), path.parent()) {
            if seed.is_relative() {
                config.store.seed = Some(dir.join(seed));
            }
        }

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.cache.refresh_interval_ms == 0 {
            return Err(AuthzError::Config(
                "cache.refresh_interval_ms must be greater than zero".to_string(),
            ));
        }

        if self.cache.fetch_timeout_ms == 0 {
            return Err(AuthzError::Config(
                "cache.fetch_timeout_ms must be greater than zero".to_string(),
            ));
        }

        if self.cache.max_backoff_ms < self.cache.refresh_interval_ms {
            return Err(AuthzError::Config(
                "cache.max_backoff_ms must not be below cache.refresh_interval_ms".to_string(),
            ));
        }

        let level = self.logging.level.to_ascii_lowercase();
        if !LOG_LEVELS.contains(&level.as_str()) {
            return Err(AuthzError::Config(format!(
                "logging.level must be one of {}, got '{}'",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Refresh loop timing
    pub fn refresh(&self) -> RefreshConfig {
        RefreshConfig {
            interval: Duration::from_millis(self.cache.refresh_interval_ms),
            fetch_timeout: Duration::from_millis(self.cache.fetch_timeout_ms),
            max_backoff: Duration::from_millis(self.cache.max_backoff_ms),
        }
    }

    /// Engine configuration
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            refresh: self.refresh(),
        }
    }
}
