//! Monitor configuration
//!
//! Loaded from TOML:
//! ```toml
//! root = "/var/spool/incoming"
//! recursive = true
//! polling_delay_ms = 500
//! include = ["*.csv"]
//! exclude = ["*.tmp"]
//! skip_temp_files = true
//! ```

use crate::filter::PathFilter;
use anyhow::{Context, Result};
use dirwatch_core::MonitorError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Monitor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonitorConfig {
    /// Directory to watch
    pub root: PathBuf,

    /// Descend into subdirectories (default: false)
    #[serde(default)]
    pub recursive: bool,

    /// Delay between polling cycles in milliseconds (default: 1000)
    #[serde(default = "default_polling_delay_ms")]
    pub polling_delay_ms: u64,

    /// Only report paths matching these patterns (empty = everything)
    #[serde(default)]
    pub include: Vec<String>,

    /// Never report paths matching these patterns
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Ignore editor swap/backup files and OS metadata files (default: false)
    #[serde(default)]
    pub skip_temp_files: bool,
}

impl MonitorConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            recursive: false,
            polling_delay_ms: default_polling_delay_ms(),
            include: vec![],
            exclude: vec![],
            skip_temp_files: false,
        }
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents).context("Failed to parse monitor config")?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&contents)
            .with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn validate(&self) -> std::result::Result<(), MonitorError> {
        if self.polling_delay_ms == 0 {
            return Err(MonitorError::InvalidDelay);
        }
        if self.root.as_os_str().is_empty() {
            return Err(MonitorError::Config("root must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn polling_delay(&self) -> Duration {
        Duration::from_millis(self.polling_delay_ms)
    }

    /// Filter built from the pattern settings, or None when nothing is filtered
    pub fn path_filter(&self) -> std::result::Result<Option<PathFilter>, MonitorError> {
        if self.include.is_empty() && self.exclude.is_empty() && !self.skip_temp_files {
            return Ok(None);
        }
        let filter = PathFilter::new(&self.root, &self.include, &self.exclude)?
            .skip_temp_files(self.skip_temp_files);
        Ok(Some(filter))
    }
}

fn default_polling_delay_ms() -> u64 {
    1000
}
