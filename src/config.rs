//! Matching configuration.
//!
//! Defaults mirror the documented configuration surface. Every entry point
//! validates its config before touching any track.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{MatchError, Result};

// ============================================================================
// Defaults
// ============================================================================

pub const DEFAULT_STRICT_THRESHOLD: f64 = 0.92;
pub const DEFAULT_LOOSE_THRESHOLD: f64 = 0.85;
pub const DEFAULT_DURATION_TOLERANCE_SECS: u32 = 5;
pub const DEFAULT_TITLE_WEIGHT: f64 = 0.6;
pub const DEFAULT_ARTIST_WEIGHT: f64 = 0.4;

/// Allowed drift when checking that title + artist weights sum to 1.0
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchConfig {
    /// textScore at or above this is a fuzzy-high match
    pub strict_threshold: f64,
    /// Lowest textScore that duration corroboration can rescue
    pub loose_threshold: f64,
    pub duration_tolerance_secs: u32,
    pub title_weight: f64,
    pub artist_weight: f64,
    /// Trust ISRC equality as authoritative
    pub use_isrc: bool,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            strict_threshold: DEFAULT_STRICT_THRESHOLD,
            loose_threshold: DEFAULT_LOOSE_THRESHOLD,
            duration_tolerance_secs: DEFAULT_DURATION_TOLERANCE_SECS,
            title_weight: DEFAULT_TITLE_WEIGHT,
            artist_weight: DEFAULT_ARTIST_WEIGHT,
            use_isrc: true,
        }
    }
}

impl MatchConfig {
    /// High-precision preset (the defaults).
    pub fn strict() -> Self {
        Self::default()
    }

    /// Higher-recall preset with lower thresholds and a wider duration window.
    pub fn lenient() -> Self {
        Self {
            strict_threshold: 0.88,
            loose_threshold: 0.78,
            duration_tolerance_secs: 9,
            ..Self::default()
        }
    }

    /// Load a config from a JSON file. Missing keys keep their defaults.
    /// The loaded config is validated before it is returned.
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: MatchConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check ranges and cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        check_unit_interval("strict_threshold", self.strict_threshold)?;
        check_unit_interval("loose_threshold", self.loose_threshold)?;

        if self.loose_threshold > self.strict_threshold {
            return Err(MatchError::config(
                "loose_threshold",
                self.loose_threshold,
                format!("must be <= strict_threshold ({})", self.strict_threshold),
            ));
        }

        check_weight("title_weight", self.title_weight)?;
        check_weight("artist_weight", self.artist_weight)?;

        let sum = self.title_weight + self.artist_weight;
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(MatchError::config(
                "title_weight",
                sum,
                "title_weight + artist_weight must sum to 1.0",
            ));
        }

        Ok(())
    }
}

fn check_unit_interval(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(MatchError::config(field, value, "must be within [0, 1]"));
    }
    Ok(())
}

fn check_weight(field: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(MatchError::config(field, value, "must be a non-negative number"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = MatchConfig::default();
        assert_eq!(config.strict_threshold, 0.92);
        assert_eq!(config.loose_threshold, 0.85);
        assert_eq!(config.duration_tolerance_secs, 5);
        assert!(config.use_isrc);
        assert!(config.validate().is_ok());
        assert!(MatchConfig::lenient().validate().is_ok());
    }

    #[test]
    fn test_loose_above_strict_rejected() {
        let config = MatchConfig {
            loose_threshold: 0.95,
            ..MatchConfig::default()
        };
        match config.validate() {
            Err(MatchError::ConfigError { field, .. }) => assert_eq!(field, "loose_threshold"),
            other => panic!("expected ConfigError, got {:?}", other),
        }
    }

    #[test]
    fn test_threshold_out_of_range_rejected() {
        let config = MatchConfig {
            strict_threshold: 1.5,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MatchConfig {
            loose_threshold: f64::NAN,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_weights_must_sum_to_one() {
        let config = MatchConfig {
            title_weight: 0.7,
            artist_weight: 0.4,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());

        let config = MatchConfig {
            title_weight: 0.5,
            artist_weight: 0.5,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_ok());

        let config = MatchConfig {
            title_weight: 1.2,
            artist_weight: -0.2,
            ..MatchConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config: MatchConfig =
            serde_json::from_str(r#"{"strict_threshold": 0.95, "use_isrc": false}"#).unwrap();
        assert_eq!(config.strict_threshold, 0.95);
        assert_eq!(config.loose_threshold, DEFAULT_LOOSE_THRESHOLD);
        assert!(!config.use_isrc);
    }

    #[test]
    fn test_from_json_file_validates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"loose_threshold": 0.99}"#).unwrap();
        assert!(MatchConfig::from_json_file(&path).is_err());

        std::fs::write(&path, r#"{"duration_tolerance_secs": 8}"#).unwrap();
        let config = MatchConfig::from_json_file(&path).unwrap();
        assert_eq!(config.duration_tolerance_secs, 8);
    }
}
