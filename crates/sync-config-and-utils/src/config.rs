//! Configuration for the sync services.

use crate::{CoreError, CoreResult, Paths};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use url::Url;

/// Default content API URL (can be overridden at compile time via ANCHORLINE_API_URL).
pub const DEFAULT_API_BASE_URL: &str = match option_env!("ANCHORLINE_API_URL") {
    Some(url) => url,
    None => "https://api.anchorline.app",
};

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Sync service configuration.
///
/// Stored as JSON in `config.json`; every field has a default so partial
/// files are accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
    /// Base URL of the content API.
    pub api_base_url: String,
    /// Bearer token for the content API. `None` means signed out.
    pub access_token: Option<String>,
    /// Per-request timeout for remote calls.
    pub request_timeout_secs: u64,
    /// Attempts per operation before it is marked failed.
    pub max_retries: u32,
    /// First retry delay; doubles per attempt.
    pub backoff_base_ms: u64,
    /// Upper bound for the retry delay.
    pub backoff_max_ms: u64,
    /// Drain cadence while drains keep finding work.
    pub active_interval_secs: u64,
    /// Drain cadence once the queue has been quiet for a while.
    pub idle_interval_secs: u64,
    /// Consecutive empty drains before switching to the idle cadence.
    pub idle_threshold: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            access_token: None,
            request_timeout_secs: 30,
            max_retries: 3,
            backoff_base_ms: 2_000,
            backoff_max_ms: 300_000,
            active_interval_secs: 60,
            idle_interval_secs: 300,
            idle_threshold: 3,
        }
    }
}

impl Config {
    /// Create a new Config with default values, then override from environment.
    pub fn new() -> Self {
        let mut config = Self::default();
        config.load_from_env();
        config
    }

    /// Load configuration from the config file under `paths`, falling back
    /// to defaults, then apply environment overrides.
    pub fn load(paths: &Paths) -> CoreResult<Self> {
        let config_path = paths.config_file();

        let mut config = if config_path.exists() {
            Self::load_from_file(&config_path)?
        } else {
            Self::default()
        };

        config.load_from_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> CoreResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a file.
    pub fn save(&self, paths: &Paths) -> CoreResult<()> {
        paths.ensure_dirs()?;
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(paths.config_file(), content)?;
        Ok(())
    }

    fn load_from_env(&mut self) {
        if let Some(level) = env_value("ANCHORLINE_LOG_LEVEL") {
            self.log_level = level;
        }
        if let Some(url) = env_value("ANCHORLINE_API_URL") {
            self.api_base_url = url;
        }
        if let Some(token) = env_value("ANCHORLINE_ACCESS_TOKEN") {
            self.access_token = Some(token);
        }
    }

    /// Reject values the sync engine cannot work with.
    pub fn validate(&self) -> CoreResult<()> {
        self.api_base_url()?;
        if self.max_retries == 0 {
            return Err(CoreError::Config("max_retries must be at least 1".into()));
        }
        if self.active_interval_secs == 0 || self.idle_interval_secs == 0 {
            return Err(CoreError::Config("sync intervals must be non-zero".into()));
        }
        if self.backoff_base_ms > self.backoff_max_ms {
            return Err(CoreError::Config(
                "backoff_base_ms must not exceed backoff_max_ms".into(),
            ));
        }
        Ok(())
    }

    /// The content API base URL, parsed.
    pub fn api_base_url(&self) -> CoreResult<Url> {
        Url::parse(&self.api_base_url).map_err(CoreError::from)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }

    pub fn backoff_max(&self) -> Duration {
        Duration::from_millis(self.backoff_max_ms)
    }

    pub fn active_interval(&self) -> Duration {
        Duration::from_secs(self.active_interval_secs)
    }

    pub fn idle_interval(&self) -> Duration {
        Duration::from_secs(self.idle_interval_secs)
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|value| !value.is_empty())
}
