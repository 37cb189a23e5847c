//! Event creation configuration

use lace_core::error::{LaceError, Result};
use lace_core::types::AncientMode;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::weight_calculator::Threshold;

/// Tunables for event creation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventCreationConfig {
    /// Maximum events per second; zero or less means unlimited
    #[serde(default = "default_max_creation_rate")]
    pub max_creation_rate: f64,

    /// Divisor of the chance to favor ignored nodes; zero or less disables it
    #[serde(default = "default_anti_selfishness_factor")]
    pub anti_selfishness_factor: f64,

    /// Longest tolerated unhealthy period before creation stops (ms)
    #[serde(default = "default_max_unhealthy_duration_ms")]
    pub max_unhealthy_duration_ms: u64,

    /// Snapshot advancement fraction, numerator
    #[serde(default = "default_supermajority_numerator")]
    pub supermajority_numerator: u64,

    /// Snapshot advancement fraction, denominator
    #[serde(default = "default_supermajority_denominator")]
    pub supermajority_denominator: u64,

    /// How long a creation attempt waits for the creator lock (ms)
    #[serde(default = "default_creator_lock_timeout_ms")]
    pub creator_lock_timeout_ms: u64,

    /// Pause between submissions of a rejected event while pausing (ms)
    #[serde(default = "default_pause_retry_interval_ms")]
    pub pause_retry_interval_ms: u64,

    /// How ancient events are recognized
    #[serde(default)]
    pub ancient_mode: AncientMode,
}

fn default_max_creation_rate() -> f64 {
    20.0
}

fn default_anti_selfishness_factor() -> f64 {
    10.0
}

fn default_max_unhealthy_duration_ms() -> u64 {
    1000
}

fn default_supermajority_numerator() -> u64 {
    2
}

fn default_supermajority_denominator() -> u64 {
    3
}

fn default_creator_lock_timeout_ms() -> u64 {
    10
}

fn default_pause_retry_interval_ms() -> u64 {
    1
}

impl Default for EventCreationConfig {
    fn default() -> Self {
        Self {
            max_creation_rate: default_max_creation_rate(),
            anti_selfishness_factor: default_anti_selfishness_factor(),
            max_unhealthy_duration_ms: default_max_unhealthy_duration_ms(),
            supermajority_numerator: default_supermajority_numerator(),
            supermajority_denominator: default_supermajority_denominator(),
            creator_lock_timeout_ms: default_creator_lock_timeout_ms(),
            pause_retry_interval_ms: default_pause_retry_interval_ms(),
            ancient_mode: AncientMode::default(),
        }
    }
}

impl EventCreationConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| LaceError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| LaceError::ConfigError(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.supermajority_denominator == 0 {
            return Err(LaceError::InvalidConfig(
                "supermajority_denominator must be positive".into(),
            ));
        }
        if self.supermajority_numerator >= self.supermajority_denominator {
            return Err(LaceError::InvalidConfig(format!(
                "supermajority fraction {}/{} must be below 1",
                self.supermajority_numerator, self.supermajority_denominator
            )));
        }
        if self.max_creation_rate.is_nan() || self.anti_selfishness_factor.is_nan() {
            return Err(LaceError::InvalidConfig("rates must be numbers".into()));
        }
        Ok(())
    }

    pub fn threshold(&self) -> Threshold {
        Threshold {
            numerator: self.supermajority_numerator,
            denominator: self.supermajority_denominator,
        }
    }

    pub fn max_unhealthy_duration(&self) -> Duration {
        Duration::from_millis(self.max_unhealthy_duration_ms)
    }

    pub fn creator_lock_timeout(&self) -> Duration {
        Duration::from_millis(self.creator_lock_timeout_ms)
    }

    pub fn pause_retry_interval(&self) -> Duration {
        Duration::from_millis(self.pause_retry_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = EventCreationConfig::default();
        assert_eq!(config.threshold(), Threshold::SUPER_MAJORITY);
        assert_eq!(config.ancient_mode, AncientMode::Generation);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = EventCreationConfig::from_toml_str(
            r#"
            max_creation_rate = 5.0
            ancient_mode = "birth_round"
            "#,
        )
        .unwrap();

        assert_eq!(config.max_creation_rate, 5.0);
        assert_eq!(config.ancient_mode, AncientMode::BirthRound);
        assert_eq!(config.anti_selfishness_factor, 10.0);
        assert_eq!(config.max_unhealthy_duration(), Duration::from_secs(1));
    }

    #[test]
    fn test_invalid_fraction_is_rejected() {
        let result = EventCreationConfig::from_toml_str(
            "supermajority_numerator = 3\nsupermajority_denominator = 3\n",
        );
        assert!(matches!(result, Err(LaceError::InvalidConfig(_))));

        let result = EventCreationConfig::from_toml_str("supermajority_denominator = 0\n");
        assert!(matches!(result, Err(LaceError::InvalidConfig(_))));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "creator_lock_timeout_ms = 25").unwrap();

        let config = EventCreationConfig::load(file.path()).unwrap();
        assert_eq!(config.creator_lock_timeout(), Duration::from_millis(25));

        let missing = EventCreationConfig::load("/definitely/not/here.toml");
        assert!(matches!(missing, Err(LaceError::ConfigError(_))));
    }
}
