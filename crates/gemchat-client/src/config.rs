//! Client configuration loaded from environment variables.
//!
//! All settings have defaults so the client works with zero configuration;
//! the API key normally lives in the stored global settings.

use std::path::PathBuf;
use std::time::Duration;

use gemchat_shared::constants::{DEFAULT_ENDPOINT, DEFAULT_TIMEOUT_SECS};

/// Client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// Base URL the model name is appended to.
    /// Env: `GEMCHAT_ENDPOINT`
    /// Default: `https://generativelanguage.googleapis.com/v1beta/models`
    pub endpoint: String,

    /// Directory holding `gemchat.db`.
    /// Env: `GEMCHAT_DATA_DIR`
    /// Default: the platform data directory.
    pub data_dir: Option<PathBuf>,

    /// Whole-request timeout for completion calls.
    /// Env: `GEMCHAT_TIMEOUT_SECS`
    /// Default: 60 seconds.
    pub timeout: Duration,

    /// Key used for this process when none is stored.  Never persisted.
    /// Env: `GEMINI_API_KEY`
    pub env_api_key: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            data_dir: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            env_api_key: None,
        }
    }
}

// The key must never reach the logs.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("data_dir", &self.data_dir)
            .field("timeout", &self.timeout)
            .field("env_api_key", &self.env_api_key.as_ref().map(|_| "<set>"))
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(endpoint) = lookup("GEMCHAT_ENDPOINT") {
            let endpoint = endpoint.trim().trim_end_matches('/');
            if !endpoint.is_empty() {
                config.endpoint = endpoint.to_string();
            }
        }

        if let Some(dir) = lookup("GEMCHAT_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = Some(PathBuf::from(dir));
            }
        }

        if let Some(secs) = lookup("GEMCHAT_TIMEOUT_SECS") {
            match secs.trim().parse::<u64>() {
                Ok(n) if n > 0 => config.timeout = Duration::from_secs(n),
                _ => {
                    tracing::warn!(value = %secs, "Invalid GEMCHAT_TIMEOUT_SECS, using default");
                }
            }
        }

        if let Some(key) = lookup("GEMINI_API_KEY") {
            let key = key.trim();
            if !key.is_empty() {
                config.env_api_key = Some(key.to_string());
            }
        }

        // RUST_LOG is read by the binary's EnvFilter.

        config
    }
}
