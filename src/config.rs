//! Client configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

pub const DEFAULT_API_URL: &str = "http://localhost:5000/api";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The base URL is not an absolute http(s) URL.
    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(String),

    /// No state directory was configured and the platform has none.
    #[error("no state directory available; set SUPPORTDESK_STATE_DIR")]
    NoStateDir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Backend API root, without a trailing slash.
    pub base_url: String,
    pub timeout: Duration,
    /// Where the file-backed session store keeps its slots.
    pub state_dir: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            state_dir: None,
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `SUPPORTDESK_API_URL`: default `http://localhost:5000/api`
    /// - `SUPPORTDESK_TIMEOUT_SECS`: default 30
    /// - `SUPPORTDESK_STATE_DIR`: default platform data dir
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidBaseUrl`] when `SUPPORTDESK_API_URL` is
    /// not an http(s) URL.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url = normalize_base_url(
            &std::env::var("SUPPORTDESK_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned()),
        )?;
        let timeout = Duration::from_secs(env_parse_u64("SUPPORTDESK_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS));
        let state_dir = std::env::var("SUPPORTDESK_STATE_DIR")
            .ok()
            .filter(|raw| !raw.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self { base_url, timeout, state_dir })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_state_dir(mut self, dir: PathBuf) -> Self {
        self.state_dir = Some(dir);
        self
    }

    /// Resolve the session state directory, falling back to the platform
    /// data directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoStateDir`] when neither is available.
    pub fn resolve_state_dir(&self) -> Result<PathBuf, ConfigError> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }
        ProjectDirs::from("ma", "soutien", "supportdesk")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or(ConfigError::NoStateDir)
    }
}

/// Trim trailing slashes and reject anything that is not http(s).
///
/// # Errors
///
/// Returns [`ConfigError::InvalidBaseUrl`] for non-http(s) input.
pub fn normalize_base_url(raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(ConfigError::InvalidBaseUrl(raw.to_owned()));
    }
    Ok(trimmed.to_owned())
}

fn env_parse_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .filter(|v| *v > 0)
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
