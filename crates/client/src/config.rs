//! Client configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors loading or validating a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(&'static str),
}

/// Parameters for transaction building and retries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// How far before "now" the validity interval starts, in milliseconds
    pub validity_offset_ms: u64,

    /// Value locked in the final record when an auction ends
    pub end_output_lovelace: u64,

    /// Value locked in a freshly created auction record
    pub creation_lovelace: u64,

    /// Full fetch-to-confirm attempts before giving up on a contested output
    pub max_attempts: u32,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            validity_offset_ms: 60_000, // 1 minute
            end_output_lovelace: 1_500_000,
            creation_lovelace: 2_000_000,
            max_attempts: 3,
        }
    }
}

impl ClientConfig {
    /// Load a JSON config file. Missing fields take their defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_attempts == 0 {
            return Err(ConfigError::Invalid("max_attempts must be at least 1"));
        }
        if self.end_output_lovelace == 0 {
            return Err(ConfigError::Invalid("end_output_lovelace must be positive"));
        }
        if self.creation_lovelace == 0 {
            return Err(ConfigError::Invalid("creation_lovelace must be positive"));
        }
        Ok(())
    }
}
