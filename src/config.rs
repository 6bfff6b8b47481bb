//! Engine configuration
//!
//! Every tunable constant of the scoring engines lives here. The configuration
//! is constructed explicitly and passed into the engines that need it; there
//! is no global state.

use crate::error::ComputeError;
use crate::types::BaselineWindow;
use chrono::Weekday;
use serde::{Deserialize, Serialize};
use std::path::Path;

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Complete configuration for the scoring pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct FluxConfig {
    pub recovery_weights: RecoveryWeights,
    pub strain: StrainConfig,
    pub baseline: BaselineConfig,
    pub sleep: SleepConfig,
    pub consistency: ConsistencyConfig,
    pub patterns: PatternConfig,
    pub week: WeekConfig,
}

/// Composite weights for the recovery score; must sum to 1.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecoveryWeights {
    pub hrv: f64,
    pub rhr: f64,
    pub sleep: f64,
}

impl Default for RecoveryWeights {
    fn default() -> Self {
        Self {
            hrv: 0.50,
            rhr: 0.30,
            sleep: 0.20,
        }
    }
}

impl RecoveryWeights {
    pub fn validate(&self) -> Result<(), ComputeError> {
        let weights = [self.hrv, self.rhr, self.sleep];
        if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ComputeError::InvalidConfig(
                "recovery weights must be finite and non-negative".to_string(),
            ));
        }
        let sum: f64 = weights.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ComputeError::InvalidConfig(format!(
                "recovery weights must sum to 1.0, got {sum}"
            )));
        }
        Ok(())
    }
}

/// Strain load model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrainConfig {
    /// Intensity weight for zones 1..5, strictly increasing
    pub zone_weights: [f64; 5],
    /// Weighted zone-minutes per strain point
    pub hr_normalization_factor: f64,
    /// Active kcal per strain point
    pub energy_normalization_factor: f64,
    /// Cap of the canonical strain scale
    pub scale_max: f64,
}

impl Default for StrainConfig {
    fn default() -> Self {
        Self {
            zone_weights: [1.0, 2.0, 3.0, 4.0, 5.0],
            hr_normalization_factor: 20.0,
            energy_normalization_factor: 200.0,
            scale_max: 21.0,
        }
    }
}

impl StrainConfig {
    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.zone_weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(ComputeError::InvalidConfig(
                "strain zone weights must be finite and non-negative".to_string(),
            ));
        }
        if self.zone_weights.windows(2).any(|pair| pair[1] <= pair[0]) {
            return Err(ComputeError::InvalidConfig(
                "strain zone weights must increase with zone number".to_string(),
            ));
        }
        require_positive("strain.hr_normalization_factor", self.hr_normalization_factor)?;
        require_positive(
            "strain.energy_normalization_factor",
            self.energy_normalization_factor,
        )?;
        require_positive("strain.scale_max", self.scale_max)
    }
}

/// Baseline windows and validity threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaselineConfig {
    pub short_window_days: u32,
    pub long_window_days: u32,
    pub min_samples: u32,
    /// Window used for HRV deviations
    pub hrv_window: BaselineWindow,
    /// Window used for resting heart rate deviations
    pub rhr_window: BaselineWindow,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            short_window_days: 7,
            long_window_days: 28,
            min_samples: 3,
            hrv_window: BaselineWindow::Long,
            rhr_window: BaselineWindow::Long,
        }
    }
}

impl BaselineConfig {
    /// Length in days of the given window
    pub fn window_days(&self, window: BaselineWindow) -> u32 {
        match window {
            BaselineWindow::Short => self.short_window_days,
            BaselineWindow::Long => self.long_window_days,
        }
    }

    pub fn validate(&self) -> Result<(), ComputeError> {
        if self.short_window_days == 0 || self.long_window_days == 0 {
            return Err(ComputeError::InvalidConfig(
                "baseline windows must be at least one day".to_string(),
            ));
        }
        if self.min_samples == 0 {
            return Err(ComputeError::InvalidConfig(
                "baseline.min_samples must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Sleep need and the trailing nights fed to the consistency calculator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    pub hours_needed: f64,
    pub consistency_window_nights: u32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            hours_needed: 8.0,
            consistency_window_nights: 7,
        }
    }
}

/// Schedule-regularity scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsistencyConfig {
    pub max_variance_hours: f64,
    pub min_nights: u32,
}

impl Default for ConsistencyConfig {
    fn default() -> Self {
        Self {
            max_variance_hours: 4.0,
            min_nights: 3,
        }
    }
}

/// |r| lower bounds of the pattern confidence buckets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PatternThresholds {
    pub low: f64,
    pub medium: f64,
    pub high: f64,
}

impl Default for PatternThresholds {
    fn default() -> Self {
        Self {
            low: 0.3,
            medium: 0.5,
            high: 0.7,
        }
    }
}

/// Correlation detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub min_sample_size: usize,
    pub thresholds: PatternThresholds,
    pub high_confidence_min_samples: usize,
    /// Lags (days) tried by a pattern scan
    pub scan_lags: Vec<u32>,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_sample_size: 5,
            thresholds: PatternThresholds::default(),
            high_confidence_min_samples: 7,
            scan_lags: vec![0, 1],
        }
    }
}

impl PatternConfig {
    pub fn validate(&self) -> Result<(), ComputeError> {
        let t = &self.thresholds;
        if !(0.0 < t.low && t.low < t.medium && t.medium < t.high && t.high <= 1.0) {
            return Err(ComputeError::InvalidConfig(format!(
                "pattern thresholds must satisfy 0 < low < medium < high <= 1, got {}/{}/{}",
                t.low, t.medium, t.high
            )));
        }
        // Pearson r needs at least two points to be defined
        if self.min_sample_size < 2 {
            return Err(ComputeError::InvalidConfig(
                "patterns.min_sample_size must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// Calendar week convention
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeekConfig {
    pub first_day: Weekday,
}

impl Default for WeekConfig {
    fn default() -> Self {
        Self {
            first_day: Weekday::Mon,
        }
    }
}

impl FluxConfig {
    /// Check every section; returns the first violation found
    pub fn validate(&self) -> Result<(), ComputeError> {
        self.recovery_weights.validate()?;
        self.strain.validate()?;
        self.baseline.validate()?;
        require_positive("sleep.hours_needed", self.sleep.hours_needed)?;
        require_positive(
            "consistency.max_variance_hours",
            self.consistency.max_variance_hours,
        )?;
        self.patterns.validate()
    }

    /// Parse and validate a configuration from JSON; missing sections keep defaults
    pub fn from_json(json: &str) -> Result<Self, ComputeError> {
        let config: FluxConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a configuration file
    pub fn from_file(path: &Path) -> Result<Self, ComputeError> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            ComputeError::InvalidConfig(format!("cannot read {}: {e}", path.display()))
        })?;
        Self::from_json(&json)
    }

    pub fn to_json_pretty(&self) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn require_positive(name: &str, value: f64) -> Result<(), ComputeError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ComputeError::InvalidConfig(format!(
            "{name} must be positive, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(FluxConfig::default().validate().is_ok());
    }

    #[test]
    fn test_recovery_weights_must_sum_to_one() {
        let weights = RecoveryWeights {
            hrv: 0.5,
            rhr: 0.3,
            sleep: 0.3,
        };
        assert!(matches!(
            weights.validate(),
            Err(ComputeError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zone_weights_must_increase() {
        let strain = StrainConfig {
            zone_weights: [1.0, 2.0, 2.0, 4.0, 5.0],
            ..Default::default()
        };
        assert!(strain.validate().is_err());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = FluxConfig::from_json(r#"{"sleep": {"hours_needed": 7.5}}"#).unwrap();
        assert_eq!(config.sleep.hours_needed, 7.5);
        assert_eq!(config.sleep.consistency_window_nights, 7);
        assert_eq!(config.baseline.long_window_days, 28);
        assert_eq!(config.week.first_day, Weekday::Mon);
    }

    #[test]
    fn test_invalid_json_config_rejected() {
        let result = FluxConfig::from_json(
            r#"{"recovery_weights": {"hrv": 0.9, "rhr": 0.3, "sleep": 0.2}}"#,
        );
        assert!(matches!(result, Err(ComputeError::InvalidConfig(_))));
    }

    #[test]
    fn test_unordered_pattern_thresholds_rejected() {
        let mut config = FluxConfig::default();
        config.patterns.thresholds.medium = 0.8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = FluxConfig::default();
        let json = config.to_json_pretty().unwrap();
        let loaded = FluxConfig::from_json(&json).unwrap();
        assert_eq!(config, loaded);
    }
}
