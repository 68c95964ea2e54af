//! # Caseflow Configuration
//!
//! Typed configuration for the case routing core. Every section has defaults,
//! so an empty configuration directory yields a usable `CaseflowConfig`.
//!
//! ## Sources (later wins)
//!
//! 1. Built-in defaults
//! 2. `<config_dir>/caseflow.toml`
//! 3. `<config_dir>/caseflow.<environment>.toml`
//! 4. Environment variables, e.g. `CASEFLOW_ENGINE__MAX_COMMIT_ATTEMPTS=8`
//!
//! ## Usage
//!
//! ```rust,no_run
//! use caseflow_core::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let width = manager.config().numbering.sequence_width;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use crate::constants::{numbering, system};
use serde::{Deserialize, Serialize};

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root configuration structure mirroring `config/caseflow.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CaseflowConfig {
    /// Case-number format
    pub numbering: NumberingConfig,

    /// Workflow engine behaviour
    pub engine: EngineConfig,

    /// Lifecycle event channel
    pub events: EventsConfig,

    /// PostgreSQL store connection settings
    pub database: DatabaseConfig,

    /// Structured logging
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NumberingConfig {
    pub prefix: String,
    /// Minimum digits of the zero-padded sequence
    pub sequence_width: usize,
}

impl Default for NumberingConfig {
    fn default() -> Self {
        Self {
            prefix: numbering::DEFAULT_PREFIX.to_string(),
            sequence_width: numbering::DEFAULT_SEQUENCE_WIDTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How many times a case unit is re-read and re-evaluated after losing a
    /// version check before the request fails with `ConcurrentModification`
    pub max_commit_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_commit_attempts: system::DEFAULT_MAX_COMMIT_ATTEMPTS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    pub channel_capacity: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            channel_capacity: system::DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: 10,
        }
    }
}

impl DatabaseConfig {
    /// Configured URL, falling back to `DATABASE_URL`
    pub fn database_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive; `RUST_LOG` takes precedence when set
    pub level: Option<String>,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl CaseflowConfig {
    /// Reject values the core cannot operate with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.numbering.prefix.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "numbering.prefix",
                &self.numbering.prefix,
                "case-number prefix must not be blank",
            ));
        }
        if self.numbering.prefix.contains(char::is_whitespace) {
            return Err(ConfigurationError::invalid_value(
                "numbering.prefix",
                &self.numbering.prefix,
                "case-number prefix must not contain whitespace",
            ));
        }
        if self.numbering.sequence_width == 0 || self.numbering.sequence_width > 18 {
            return Err(ConfigurationError::invalid_value(
                "numbering.sequence_width",
                self.numbering.sequence_width,
                "must be between 1 and 18",
            ));
        }
        if self.engine.max_commit_attempts == 0 {
            return Err(ConfigurationError::invalid_value(
                "engine.max_commit_attempts",
                self.engine.max_commit_attempts,
                "at least one commit attempt is required",
            ));
        }
        if self.events.channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "events.channel_capacity",
                self.events.channel_capacity,
                "broadcast channel capacity must be positive",
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                self.database.max_connections,
                "pool needs at least one connection",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CaseflowConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.numbering.prefix, "FILE");
        assert_eq!(config.numbering.sequence_width, 3);
        assert_eq!(config.engine.max_commit_attempts, 5);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = CaseflowConfig::default();
        config.numbering.sequence_width = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigurationError::InvalidValue { ref field, .. }) if field == "numbering.sequence_width"
        ));

        let mut config = CaseflowConfig::default();
        config.numbering.prefix = "CASE FILE".to_string();
        assert!(config.validate().is_err());

        let mut config = CaseflowConfig::default();
        config.engine.max_commit_attempts = 0;
        assert!(config.validate().is_err());
    }
}
