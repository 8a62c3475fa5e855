use anyhow::{Context, Result, anyhow, bail, ensure};
use directories::ProjectDirs;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf, str::FromStr, time::Duration};

use crate::forecast::DEFAULT_PERIOD_LIMIT;

pub const DEFAULT_API_BASE: &str = "https://api.weather.gov";
pub const DEFAULT_USER_AGENT: &str = "weather-app/1.0";
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

pub const ENV_API_BASE: &str = "WEATHER_API_BASE";
pub const ENV_API_KEY: &str = "WEATHER_API_KEY";
pub const ENV_USER_AGENT: &str = "WEATHER_USER_AGENT";
pub const ENV_TIMEOUT_SECS: &str = "WEATHER_TIMEOUT_SECS";
pub const ENV_FORECAST_PERIODS: &str = "WEATHER_FORECAST_PERIODS";

/// Upstream connection settings.
///
/// Example TOML:
/// ```toml
/// api_base = "https://api.weather.gov"
/// user_agent = "weather-app/1.0"
/// timeout_secs = 10
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL every upstream path is appended to.
    pub api_base: String,

    /// Sent as the `apikey` query parameter when present.
    pub api_key: Option<String>,

    /// Client identifier sent as `User-Agent`.
    pub user_agent: String,

    pub timeout_secs: u64,

    /// How many forecast periods `get_forecast` renders.
    pub forecast_periods: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            forecast_periods: DEFAULT_PERIOD_LIMIT,
        }
    }
}

impl Config {
    /// Config file, then environment overrides, then validation.
    pub fn load() -> Result<Self> {
        let mut cfg = Self::load_file()?;
        cfg.apply_env(|name| std::env::var(name).ok())?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load config from disk, or return defaults if it doesn't exist yet.
    pub fn load_file() -> Result<Self> {
        let path = Self::config_file_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Overlay values from `var` (normally `std::env::var`). Empty values are ignored.
    pub fn apply_env<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        if let Some(base) = lookup(ENV_API_BASE) {
            self.api_base = base;
        }
        if let Some(key) = lookup(ENV_API_KEY) {
            self.api_key = Some(key);
        }
        if let Some(agent) = lookup(ENV_USER_AGENT) {
            self.user_agent = agent;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.timeout_secs = parse_env(ENV_TIMEOUT_SECS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_FORECAST_PERIODS) {
            self.forecast_periods = parse_env(ENV_FORECAST_PERIODS, &raw)?;
        }

        Ok(())
    }

    /// Reject settings that would produce malformed upstream requests.
    pub fn validate(&self) -> Result<()> {
        self.api_base_url()?;

        ensure!(!self.user_agent.trim().is_empty(), "User agent must not be empty");
        ensure!(self.timeout_secs > 0, "Request timeout must be at least one second");
        ensure!(self.forecast_periods > 0, "Forecast period limit must be at least 1");

        if let Some(key) = &self.api_key {
            ensure!(
                !key.trim().is_empty(),
                "API key is set but blank.\n\
                 Hint: remove `api_key` from the config file or unset {ENV_API_KEY}."
            );
        }

        Ok(())
    }

    pub fn api_base_url(&self) -> Result<Url> {
        let url = Url::parse(&self.api_base)
            .with_context(|| format!("Invalid upstream base URL: {}", self.api_base))?;

        if !matches!(url.scheme(), "http" | "https") {
            bail!("Upstream base URL must use http or https: {}", self.api_base);
        }

        Ok(url)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        let path = Self::config_file_path()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(&path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-mcp", "weather-mcp")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }
}

fn parse_env<T>(name: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse()
        .with_context(|| format!("Invalid value for {name}: {raw:?}"))
}
