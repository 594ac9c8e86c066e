//! Run configuration.
//!
//! A JSON file with any subset of the fields below; missing fields take
//! their defaults:
//!
//! ```json
//! { "max_steps": 100000, "trace": true, "trap": "console" }
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// How `JMS` to the trap vector is handled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrapMode {
    /// Ordinary subroutine call.
    #[default]
    Off,
    /// Stop the run.
    Halt,
    /// Console services (`ConsoleTrap`).
    Console,
}

impl std::str::FromStr for TrapMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "off" => Ok(TrapMode::Off),
            "halt" => Ok(TrapMode::Halt),
            "console" => Ok(TrapMode::Console),
            other => Err(ConfigError::Invalid(format!("unknown trap mode '{other}'"))),
        }
    }
}

/// Options for a single run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Host step budget. `None` runs until the program halts.
    pub max_steps: Option<u64>,
    /// Log every retired instruction.
    pub trace: bool,
    /// Trap vector handling.
    pub trap: TrapMode,
}

impl RunConfig {
    /// Parse from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), ?config, "config loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_steps == Some(0) {
            return Err(ConfigError::Invalid("max_steps must be at least 1".into()));
        }
        Ok(())
    }
}

/// Errors that can occur while loading a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid config JSON: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(RunConfig::from_json_str("{}").unwrap(), RunConfig::default());
    }

    #[test]
    fn test_full_config() {
        let config = RunConfig::from_json_str(r#"{"max_steps": 500, "trace": true, "trap": "console"}"#).unwrap();
        assert_eq!(config.max_steps, Some(500));
        assert!(config.trace);
        assert_eq!(config.trap, TrapMode::Console);
    }

    #[test]
    fn test_rejects_unknown_field() {
        let err = RunConfig::from_json_str(r#"{"max_cycles": 5}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_rejects_zero_budget() {
        let err = RunConfig::from_json_str(r#"{"max_steps": 0}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_trap_mode_from_str() {
        assert_eq!("HALT".parse::<TrapMode>().unwrap(), TrapMode::Halt);
        assert!("sometimes".parse::<TrapMode>().is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = RunConfig::load("/nonexistent/run.json").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
