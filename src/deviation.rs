//! Deviation from baseline
//!
//! Converts a day's value into a z-score, a fractional deviation from the
//! baseline mean and a 0-100 percentile. The percentile is what composite
//! scores consume, so a deviation of any size stays within its weight.

use crate::types::{Baseline, Confidence, DeviationResult};
use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;
use tracing::debug;

/// Largest |z| still considered within normal range
pub const IN_RANGE_Z: f64 = 1.0;

/// Stateless deviation calculator
pub struct DeviationCalculator;

impl DeviationCalculator {
    /// Compare `value` against `baseline`.
    ///
    /// An invalid baseline or one with zero spread yields the neutral result
    /// (z = 0, percentile 50, low confidence) instead of an error.
    pub fn deviation(value: f64, baseline: &Baseline) -> DeviationResult {
        if !baseline.is_valid() || baseline.std_dev <= 0.0 || !value.is_finite() {
            debug!(
                signal = baseline.signal.as_str(),
                valid = baseline.valid,
                std_dev = baseline.std_dev,
                "neutral deviation"
            );
            return Self::neutral();
        }

        let z_score = (value - baseline.mean) / baseline.std_dev;
        let percent_deviation = if baseline.mean != 0.0 {
            (value - baseline.mean) / baseline.mean
        } else {
            0.0
        };

        DeviationResult {
            z_score,
            percent_deviation,
            in_range: z_score.abs() <= IN_RANGE_Z,
            percentile: z_to_percentile(z_score),
            confidence: Confidence::High,
        }
    }

    /// Result used whenever the baseline cannot support a comparison
    pub fn neutral() -> DeviationResult {
        DeviationResult {
            z_score: 0.0,
            percent_deviation: 0.0,
            in_range: true,
            percentile: 50.0,
            confidence: Confidence::Low,
        }
    }
}

/// Standard-normal CDF of `z`, scaled to 0-100
pub fn z_to_percentile(z: f64) -> f64 {
    if z.is_nan() {
        return 50.0;
    }
    (50.0 * (1.0 + erf(z / SQRT_2))).clamp(0.0, 100.0)
}
