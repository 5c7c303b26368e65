//! Governance configuration

use crate::error::ConfigError;
use baseline_governance::{EXCLUSION_LOG_CAPACITY, MIN_REASON_CHARS};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables for the governance service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GovernanceConfig {
    /// Minimum scope-change reason length after trimming
    pub min_reason_chars: usize,
    /// Exclusion log entries retained per brief
    pub exclusion_log_capacity: usize,
    /// Scope changes on a brief already used for grading need explicit confirmation
    pub require_live_change_confirmation: bool,
    /// Listings include archived documents unless the query says otherwise
    pub include_archived_by_default: bool,
}

impl GovernanceConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With minimum reason length
    #[inline]
    #[must_use]
    pub fn with_min_reason_chars(mut self, chars: usize) -> Self {
        self.min_reason_chars = chars;
        self
    }

    /// With exclusion log capacity
    #[inline]
    #[must_use]
    pub fn with_exclusion_log_capacity(mut self, capacity: usize) -> Self {
        self.exclusion_log_capacity = capacity;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_live_change_confirmation(mut self, required: bool) -> Self {
        self.require_live_change_confirmation = required;
        self
    }

    #[inline]
    #[must_use]
    pub fn with_archived_by_default(mut self, include: bool) -> Self {
        self.include_archived_by_default = include;
        self
    }

    /// Parse and validate TOML; missing keys take defaults
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::info!("Loaded governance config from {}", path.display());
        Ok(config)
    }

    /// Reject values that would disable a guard
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_reason_chars == 0 {
            return Err(ConfigError::Invalid {
                field: "min_reason_chars",
                reason: "must be at least 1".into(),
            });
        }
        if self.exclusion_log_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "exclusion_log_capacity",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            min_reason_chars: MIN_REASON_CHARS,
            exclusion_log_capacity: EXCLUSION_LOG_CAPACITY,
            require_live_change_confirmation: true,
            include_archived_by_default: false,
        }
    }
}
