// src/config.rs

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::util::read_to_string;

/// Root configuration loaded from `hspoll.yaml`.
///
/// This file controls:
/// - Which API status URLs are relative to
/// - Where the access token comes from
/// - How long to wait between status checks
///
/// Every value has a default, so the file itself is optional.
/// CLI flags override file values.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub polling: PollingConfig,
}

/// API section.
///
/// Example in hspoll.yaml:
///
/// api:
///   base_url: https://api.hubapi.com
///   token_env: HUBSPOT_TOKEN
///   timeout_secs: 30
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    /// Base URL that relative status paths are joined to.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Name of the environment variable holding the bearer token.
    #[serde(default = "default_token_env")]
    pub token_env: String,

    /// Per-request timeout for a single status fetch.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            token_env: default_token_env(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Polling section.
///
/// polling:
///   delay_ms: 5000
#[derive(Debug, Deserialize)]
pub struct PollingConfig {
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_delay_ms(),
        }
    }
}

fn default_token_env() -> String {
    "HUBSPOT_TOKEN".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_delay_ms() -> u64 {
    crate::polling::DEFAULT_POLLING_DELAY.as_millis() as u64
}

impl Config {
    /// Load and parse `hspoll.yaml` from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = read_to_string(path)?;
        Self::parse(&raw)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!("No config at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    pub fn parse(raw: &str) -> Result<Self> {
        // An empty file deserialises to `null`, which serde_yaml rejects for structs.
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        let cfg: Config = serde_yaml::from_str(raw).context("Failed to parse YAML config")?;
        Ok(cfg)
    }

    /// Read the bearer token from the configured environment variable.
    ///
    /// Empty values count as unset.
    pub fn token(&self) -> Option<String> {
        std::env::var(&self.api.token_env)
            .ok()
            .filter(|t| !t.trim().is_empty())
    }
}

/// Contents written by `hspoll init`.
pub fn default_config_yaml() -> &'static str {
    r#"# hspoll configuration

api:
  # Relative status URLs passed to `hspoll watch` are joined to this.
  base_url: https://api.hubapi.com
  # Environment variable holding the bearer token (a .env file works too).
  token_env: HUBSPOT_TOKEN
  timeout_secs: 30

polling:
  delay_ms: 5000
"#
}
