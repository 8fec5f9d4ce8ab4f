//! User configuration loaded from `~/.lifeos/config.json`
//!
//! Every field has a default, so a missing file or a partial file is fine.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::PlannerError;
use crate::log_slice::MAX_CONTEXT_CHARS;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// IANA zone name used to decide what "today" is. System zone when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,
    #[serde(default)]
    pub retry: RetryConfig,
    /// Where the planner state blob lives. Defaults to `~/.lifeos/state.json`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_path: Option<String>,
    /// AI service key as pasted by the user. Read through [`Config::api_key`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

fn default_max_context_chars() -> usize {
    MAX_CONTEXT_CHARS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            timezone: None,
            max_context_chars: default_max_context_chars(),
            retry: RetryConfig::default(),
            state_path: None,
            api_key: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1000,
        }
    }
}

impl Config {
    /// Configured zone, or `None` (with a warning) when it does not parse.
    pub fn timezone(&self) -> Option<chrono_tz::Tz> {
        let name = self.timezone.as_deref()?;
        match name.parse::<chrono_tz::Tz>() {
            Ok(tz) => Some(tz),
            Err(_) => {
                log::warn!("Unknown timezone '{}' in config; using system local time", name);
                None
            }
        }
    }

    /// Local calendar day of `now` in the configured zone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        match self.timezone() {
            Some(tz) => now.with_timezone(&tz).date_naive(),
            None => now.with_timezone(&Local).date_naive(),
        }
    }

    /// Cleaned, validated API key.
    pub fn api_key(&self) -> Result<String, PlannerError> {
        validate_api_key(self.api_key.as_deref().unwrap_or_default())
    }

    /// Backoff settings for the AI caller, which lives outside this crate and
    /// wraps its requests in [`crate::retry::retry_with`].
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            base_delay: Duration::from_millis(self.retry.base_delay_ms),
        }
    }

    pub fn resolved_state_path(&self) -> Result<PathBuf, PlannerError> {
        match &self.state_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => Ok(config_dir()?.join("state.json")),
        }
    }
}

const API_KEY_PREFIX: &str = "AIza";
const API_KEY_MIN_LEN: usize = 21;

/// Trim and drop every character outside `[A-Za-z0-9_.-]`.
///
/// Keys pasted from a browser often carry quotes, spaces or zero-width
/// characters.
pub fn clean_api_key(key: &str) -> String {
    key.trim()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
        .collect()
}

/// Cleaned key if it looks like a Gemini key (`AIza` prefix, longer than
/// 20 characters).
pub fn validate_api_key(key: &str) -> Result<String, PlannerError> {
    let cleaned = clean_api_key(key);
    if cleaned.is_empty() {
        return Err(PlannerError::MissingApiKey);
    }
    if cleaned.starts_with(API_KEY_PREFIX) && cleaned.len() >= API_KEY_MIN_LEN {
        Ok(cleaned)
    } else {
        log::warn!("Configured API key is malformed ({} chars)", cleaned.len());
        Err(PlannerError::InvalidApiKey)
    }
}

/// `~/.lifeos`
pub fn config_dir() -> Result<PathBuf, PlannerError> {
    let home = dirs::home_dir()
        .ok_or_else(|| PlannerError::Configuration("Could not find home directory".into()))?;
    Ok(home.join(".lifeos"))
}

/// Get the canonical config file path (~/.lifeos/config.json)
pub fn config_path() -> Result<PathBuf, PlannerError> {
    Ok(config_dir()?.join("config.json"))
}

/// Load configuration from ~/.lifeos/config.json
pub fn load_config() -> Result<Config, PlannerError> {
    load_config_from(&config_path()?)
}

pub fn load_config_from(path: &Path) -> Result<Config, PlannerError> {
    if !path.exists() {
        log::info!("No config at {}, using defaults", path.display());
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| {
        PlannerError::Configuration(format!("Failed to parse {}: {}", path.display(), e))
    })
}
