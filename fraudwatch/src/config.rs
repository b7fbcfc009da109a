use std::time::Duration;
use thiserror::Error;

use crate::{api::ApiClient, stream::metrics::DEFAULT_POLL_INTERVAL};

/// Value treated as "no key" because it ships in the sample `.env`.
const PLACEHOLDER_API_KEY: &str = "your_gemini_api_key_here";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Console configuration, read from the environment.
///
/// | variable | default |
/// |---|---|
/// | `FRAUDWATCH_API_URL` | `http://localhost:8000` |
/// | `FRAUDWATCH_POLL_SECS` | `30` |
/// | `FRAUDWATCH_TOKEN` | none |
/// | `GEMINI_API_KEY` | none |
/// | `GEMINI_MODEL` | `gemini-3-flash-preview` |
/// | `GEMINI_API_URL` | `https://generativelanguage.googleapis.com` |
///
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub api_url: String,
    pub poll_interval: Duration,
    pub token: Option<String>,
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub api_url: String,
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-3-flash-preview".to_string(),
            api_url: "https://generativelanguage.googleapis.com".to_string(),
            temperature: 0.5,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: ApiClient::DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            token: None,
            chat: ChatConfig::default(),
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let mut config = Self::default();

        if let Some(url) = get("FRAUDWATCH_API_URL") {
            config.api_url = url;
        }
        if let Some(secs) = get("FRAUDWATCH_POLL_SECS") {
            config.poll_interval = secs
                .parse::<u64>()
                .ok()
                .filter(|s| *s > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::Invalid {
                    key: "FRAUDWATCH_POLL_SECS",
                    value: secs,
                })?;
        }
        config.token = get("FRAUDWATCH_TOKEN");

        config.chat.api_key = get("GEMINI_API_KEY").filter(|k| k != PLACEHOLDER_API_KEY);
        if let Some(model) = get("GEMINI_MODEL") {
            config.chat.model = model;
        }
        if let Some(url) = get("GEMINI_API_URL") {
            config.chat.api_url = url;
        }

        Ok(config)
    }
}
