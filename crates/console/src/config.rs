//! Console configuration from the environment.
//!
//! | Variable              | Default                                   |
//! |-----------------------|-------------------------------------------|
//! | `MUNIFACT_API_URL`    | `http://localhost:8000/api`               |
//! | `MUNIFACT_STATE_FILE` | `<data dir>/munifact/session.json`        |
//! | `MUNIFACT_LOG`        | `info` (`RUST_LOG` still takes priority)  |

use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleConfig {
    /// Base URL every backend path is appended to (no trailing slash).
    pub api_url: String,
    /// Where the persisted session lives on native builds.
    pub state_file: Option<PathBuf>,
    pub log_filter: String,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            state_file: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl ConsoleConfig {
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_url: normalize_api_url(api_url)?,
            state_file: None,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        })
    }

    /// Read the configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (tests pass a map).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_url = lookup("MUNIFACT_API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let state_file = match lookup("MUNIFACT_STATE_FILE") {
            Some(path) => Some(PathBuf::from(path)),
            None => default_state_file(),
        };
        let log_filter = lookup("MUNIFACT_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Self {
            api_url: normalize_api_url(&api_url)?,
            state_file,
            log_filter,
        })
    }

    /// State file path, or an error when none could be resolved.
    pub fn require_state_file(&self) -> Result<&PathBuf, ConfigError> {
        self.state_file.as_ref().ok_or(ConfigError::NoStateDir)
    }
}

fn normalize_api_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    let url = reqwest::Url::parse(trimmed).map_err(|_| ConfigError::InvalidApiUrl(raw.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidApiUrl(raw.to_string()));
    }
    Ok(trimmed.to_string())
}

#[cfg(not(target_arch = "wasm32"))]
fn default_state_file() -> Option<PathBuf> {
    let base = dirs::data_dir().or_else(|| {
        dirs::home_dir().map(|mut h| {
            h.push(".local");
            h.push("share");
            h
        })
    })?;
    Some(base.join("munifact").join("session.json"))
}

#[cfg(target_arch = "wasm32")]
fn default_state_file() -> Option<PathBuf> {
    None
}
