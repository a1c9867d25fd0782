//! File system paths for the sync services.

use crate::{CoreError, CoreResult};
use std::path::PathBuf;

/// Database filename under the base directory.
const DATABASE_FILE_NAME: &str = "anchorline.sqlite";
/// Structured log filename under the logs directory.
const SYNC_LOG_FILE_NAME: &str = "sync.jsonl";

/// Manages file system paths for the sync services.
#[derive(Debug, Clone)]
pub struct Paths {
    /// Base directory for config, database and logs (~/.anchorline)
    base_dir: PathBuf,
}

impl Paths {
    /// Create a Paths instance rooted at `~/.anchorline`.
    pub fn new() -> CoreResult<Self> {
        let home = dirs::home_dir()
            .ok_or_else(|| CoreError::Path("Could not determine home directory".to_string()))?;

        Ok(Self {
            base_dir: home.join(".anchorline"),
        })
    }

    /// Create a new Paths instance with a custom base directory.
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Get the base directory (~/.anchorline).
    pub fn base_dir(&self) -> &PathBuf {
        &self.base_dir
    }

    /// Get the config file path (~/.anchorline/config.json).
    pub fn config_file(&self) -> PathBuf {
        self.base_dir.join("config.json")
    }

    /// Get the database file path (~/.anchorline/anchorline.sqlite).
    pub fn database_file(&self) -> PathBuf {
        self.base_dir.join(DATABASE_FILE_NAME)
    }

    /// Get the logs directory (~/.anchorline/logs).
    pub fn logs_dir(&self) -> PathBuf {
        self.base_dir.join("logs")
    }

    /// Get the structured sync log path (~/.anchorline/logs/sync.jsonl).
    pub fn sync_log_file(&self) -> PathBuf {
        self.logs_dir().join(SYNC_LOG_FILE_NAME)
    }

    /// Ensure all required directories exist.
    pub fn ensure_dirs(&self) -> CoreResult<()> {
        std::fs::create_dir_all(&self.base_dir)?;
        std::fs::create_dir_all(self.logs_dir())?;
        Ok(())
    }
}
