//! Queue configuration.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{QueueError, QueueResult};

/// Concurrency used when none is configured.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Queue configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    /// Maximum number of tasks in flight at once.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Name attached to log records emitted by the queue.
    #[serde(default)]
    pub name: Option<String>,
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            name: None,
        }
    }
}

impl QueueConfig {
    /// Parse and validate a configuration from TOML.
    pub fn from_toml_str(content: &str) -> QueueResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration from a TOML file.
    pub fn from_file(path: &Path) -> QueueResult<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Check that the configuration describes a usable queue.
    pub fn validate(&self) -> QueueResult<()> {
        if self.concurrency == 0 {
            return Err(QueueError::InvalidConcurrency(self.concurrency));
        }
        Ok(())
    }
}
