use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, time::Duration};
use tracing::debug;

use super::getter::{DEFAULT_INTERVAL, DEFAULT_PERIOD};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct YahooProviderConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for YahooProviderConfig {
    fn default() -> Self {
        YahooProviderConfig {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            timeout_secs: 30,
        }
    }
}

impl YahooProviderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub yfinance: YahooProviderConfig,
}

/// How many times a failed source request is retried, not counting the first try.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct RetryConfig {
    #[serde(default = "default_max_retry")]
    pub max_retry: u32,
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            max_retry: default_max_retry(),
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_max_retry() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    500
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct DefaultsConfig {
    pub source: String,
    pub interval: String,
    pub period: String,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        DefaultsConfig {
            source: "yfinance".to_string(),
            interval: DEFAULT_INTERVAL.to_string(),
            period: DEFAULT_PERIOD.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub defaults: DefaultsConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    /// Loads the config at `path`, or the default location when `path` is
    /// `None`. A missing default config falls back to built-in defaults.
    pub fn load_or_default(path: Option<&std::path::Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load_from_path(path);
        }
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using built-in defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("org", "sharpe", "sharpe")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
