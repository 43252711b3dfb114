//! Client configuration
//!
//! Read from `<config dir>/dataverse-api/config.toml` (or an explicit path),
//! then overridden by `DATAVERSE_*` environment variables. A `.env` file in
//! the working directory is loaded first.

use crate::api::constants::{DEFAULT_BATCH_SIZE, DEFAULT_TIMEOUT_SECS, MAX_BATCH_SIZE};
use crate::api::resilience::ResilienceConfig;
use crate::error::{DataverseError, Result};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_URL: &str = "DATAVERSE_URL";
pub const ENV_TOKEN: &str = "DATAVERSE_TOKEN";
pub const ENV_BATCH_SIZE: &str = "DATAVERSE_BATCH_SIZE";
pub const ENV_TIMEOUT_SECS: &str = "DATAVERSE_TIMEOUT_SECS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// e.g. `https://org.crm4.dynamics.com`
    pub environment_url: String,
    pub timeout_secs: u64,
    pub batch_size: usize,
    /// Pre-acquired bearer token; only ever read from the environment
    #[serde(skip)]
    pub access_token: Option<String>,
    pub resilience: ResilienceConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            environment_url: String::new(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            batch_size: DEFAULT_BATCH_SIZE,
            access_token: None,
            resilience: ResilienceConfig::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(environment_url: impl Into<String>) -> Self {
        Self {
            environment_url: environment_url.into(),
            ..Default::default()
        }
    }

    pub fn with_resilience(mut self, resilience: ResilienceConfig) -> Self {
        self.resilience = resilience;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("dataverse-api").join("config.toml"))
    }

    /// Default file (if present) plus `.env` and environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match Self::default_path() {
            Some(path) if path.exists() => Self::load_file(&path)?,
            _ => {
                debug!("No config file found, using defaults");
                Self::default()
            }
        };
        config.apply_env();
        Ok(config)
    }

    /// Explicit file plus `.env` and environment overrides
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut config = Self::load_file(path)?;
        config.apply_env();
        Ok(config)
    }

    pub fn load_file(path: &Path) -> Result<Self> {
        debug!("Loading config from: {:?}", path);
        let content = fs::read_to_string(path)
            .map_err(|e| DataverseError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml(&content)
            .map_err(|e| DataverseError::Config(format!("{} ({})", e, path.display())))
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| DataverseError::Config(format!("Invalid config: {}", e)))
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| DataverseError::Config(format!("Failed to serialize config: {}", e)))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| DataverseError::Config(format!("Failed to create {}: {}", parent.display(), e)))?;
        }
        fs::write(path, content)
            .map_err(|e| DataverseError::Config(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn apply_env(&mut self) {
        if let Err(e) = dotenvy::dotenv() {
            if !e.not_found() {
                warn!("Ignoring unreadable .env file: {}", e);
            }
        }
        self.apply_overrides(|name| std::env::var(name).ok());
    }

    /// Apply `DATAVERSE_*` overrides from `lookup`; unparsable numbers are ignored with a warning
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(ENV_URL) {
            self.environment_url = url;
        }
        if let Some(token) = lookup(ENV_TOKEN) {
            self.access_token = Some(token);
        }
        if let Some(raw) = lookup(ENV_BATCH_SIZE) {
            match raw.trim().parse() {
                Ok(size) => self.batch_size = size,
                Err(_) => warn!("{} is not a number: {}", ENV_BATCH_SIZE, raw),
            }
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            match raw.trim().parse() {
                Ok(secs) => self.timeout_secs = secs,
                Err(_) => warn!("{} is not a number: {}", ENV_TIMEOUT_SECS, raw),
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let url = self.environment_url.trim();
        if url.is_empty() {
            return Err(DataverseError::Config(format!(
                "Environment URL is not set (config file or {})",
                ENV_URL
            )));
        }
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| DataverseError::Config(format!("Invalid environment URL '{}': {}", url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(DataverseError::Config(format!(
                "Environment URL must use http or https: {}",
                url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(DataverseError::Config("timeout_secs must be at least 1".to_string()));
        }
        self.resilience.rate_limit.validate()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Batch size clamped to what a single `$batch` request accepts
    pub fn effective_batch_size(&self) -> usize {
        self.batch_size.clamp(1, MAX_BATCH_SIZE)
    }
}
