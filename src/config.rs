use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{ReconError, Result};
use crate::pipeline::disruption::DEFAULT_IN_TRANSIT_WINDOW_DAYS;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub collaborator: CollaboratorConfig,
    pub reconcile: ReconcileConfig,
}

/// Endpoint settings for the external correction collaborator. The API key
/// is deliberately not configured here; it comes from the environment.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CollaboratorConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_seconds: u64,
}

impl Default for CollaboratorConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            timeout_seconds: 120,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    pub delimiter: char,
    pub in_transit_window_days: i64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            in_transit_window_days: DEFAULT_IN_TRANSIT_WINDOW_DAYS,
        }
    }
}

impl Config {
    /// Load `config.toml` from the working directory. A missing file yields
    /// the defaults; a malformed file is a configuration error.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("config.toml"))
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }
        let content = fs::read_to_string(path).map_err(|e| {
            ReconError::Config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
