//! Semi-sync configuration
//!
//! Loaded once at startup and handed to `SemiSyncMaster::initialize`.
//! Every field has a default so an empty JSON object is a valid config.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::errors::{SemiSyncError, SemiSyncResult};

/// Upper bound on an explicit quorum size.
pub const MAX_QUORUM: u32 = 1024;

/// Semi-sync startup configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemiSyncConfig {
    /// Enable semi-sync at startup (default: false)
    #[serde(default)]
    pub enabled: bool,

    /// Replicas that must acknowledge a position (default: 0, meaning a
    /// majority of the live replicas at the time the quorum is applied)
    #[serde(default)]
    pub quorum: u32,

    /// Auto-fallback setting, reported in status (default: true).
    /// Timeouts fall back to async regardless.
    #[serde(default = "default_auto_fallback")]
    pub auto_fallback: bool,
}

fn default_auto_fallback() -> bool {
    true
}

impl Default for SemiSyncConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            quorum: 0,
            auto_fallback: default_auto_fallback(),
        }
    }
}

impl SemiSyncConfig {
    /// Enabled config with an explicit quorum.
    pub fn enabled_with_quorum(quorum: u32) -> Self {
        Self {
            enabled: true,
            quorum,
            ..Default::default()
        }
    }

    /// Load configuration from a JSON file.
    pub fn load(path: &Path) -> SemiSyncResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| SemiSyncError::Io(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    /// Parse and validate configuration from a JSON string.
    pub fn from_json(content: &str) -> SemiSyncResult<Self> {
        let config: SemiSyncConfig = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate field ranges.
    pub fn validate(&self) -> SemiSyncResult<()> {
        if self.quorum > MAX_QUORUM {
            return Err(SemiSyncError::Config(format!(
                "quorum {} exceeds maximum of {}",
                self.quorum, MAX_QUORUM
            )));
        }
        Ok(())
    }
}
