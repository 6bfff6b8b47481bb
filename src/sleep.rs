//! Sleep performance
//!
//! Weighted sub-score of hours slept versus need, sleep efficiency and
//! schedule consistency.

use crate::error::ComputeError;
use crate::types::{ScoreComponent, SleepPerformanceScore};

/// Reported hours-vs-need ratio is capped here
pub const HOURS_RATIO_CAP: f64 = 1.5;

const HOURS_WEIGHT: f64 = 0.40;
const EFFICIENCY_WEIGHT: f64 = 0.30;
const CONSISTENCY_WEIGHT: f64 = 0.30;

/// Sleep performance calculator
pub struct SleepPerformanceEngine;

impl SleepPerformanceEngine {
    /// Compute sleep performance.
    ///
    /// `hours_vs_need` is reported up to 1.5 but contributes at most 1.0, so
    /// oversleeping earns no bonus. `hours_needed <= 0` is rejected.
    pub fn calculate(
        hours_slept: f64,
        hours_needed: f64,
        efficiency: f64,
        consistency: f64,
    ) -> Result<SleepPerformanceScore, ComputeError> {
        if !hours_needed.is_finite() || hours_needed <= 0.0 {
            return Err(ComputeError::InvalidInput(format!(
                "hours needed must be positive, got {hours_needed}"
            )));
        }
        if !hours_slept.is_finite() || hours_slept < 0.0 {
            return Err(ComputeError::InvalidInput(format!(
                "hours slept must be non-negative, got {hours_slept}"
            )));
        }
        require_unit("efficiency", efficiency)?;
        require_unit("consistency", consistency)?;

        let hours_vs_need = (hours_slept / hours_needed).min(HOURS_RATIO_CAP);
        let hours_credit = hours_vs_need.min(1.0);

        let components = vec![
            ScoreComponent::new("hours_vs_need", HOURS_WEIGHT, hours_vs_need, hours_credit * 100.0),
            ScoreComponent::new("efficiency", EFFICIENCY_WEIGHT, efficiency, efficiency * 100.0),
            ScoreComponent::new(
                "consistency",
                CONSISTENCY_WEIGHT,
                consistency,
                consistency * 100.0,
            ),
        ];
        let score = components
            .iter()
            .map(|c| c.contribution)
            .sum::<f64>()
            .clamp(0.0, 100.0);

        Ok(SleepPerformanceScore {
            score,
            hours_vs_need,
            efficiency,
            consistency,
            components,
        })
    }
}

fn require_unit(name: &str, value: f64) -> Result<(), ComputeError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ComputeError::InvalidInput(format!(
            "{name} must be within 0-1, got {value}"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sleep_perfect_score() {
        let score = SleepPerformanceEngine::calculate(8.0, 8.0, 1.0, 1.0).unwrap();
        assert!((score.score - 100.0).abs() < 1e-9);
        assert!((score.hours_vs_need - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_weighted_formula() {
        // 0.4 * 0.75 + 0.3 * 0.9 + 0.3 * 0.5 = 0.72
        let score = SleepPerformanceEngine::calculate(6.0, 8.0, 0.9, 0.5).unwrap();
        assert!((score.score - 72.0).abs() < 1e-9);
        assert_eq!(score.components.len(), 3);
    }

    #[test]
    fn test_oversleep_reported_but_not_rewarded() {
        let score = SleepPerformanceEngine::calculate(10.0, 8.0, 0.9, 0.8).unwrap();
        let baseline = SleepPerformanceEngine::calculate(8.0, 8.0, 0.9, 0.8).unwrap();

        assert!((score.hours_vs_need - 1.25).abs() < 1e-9);
        assert!((score.score - baseline.score).abs() < 1e-9);
    }

    #[test]
    fn test_hours_ratio_capped_at_one_and_a_half() {
        let score = SleepPerformanceEngine::calculate(14.0, 8.0, 0.9, 0.8).unwrap();
        assert_eq!(score.hours_vs_need, HOURS_RATIO_CAP);
    }

    #[test]
    fn test_non_positive_need_rejected() {
        for need in [0.0, -1.0] {
            assert!(matches!(
                SleepPerformanceEngine::calculate(7.0, need, 0.9, 0.8),
                Err(ComputeError::InvalidInput(_))
            ));
        }
    }

    #[test]
    fn test_out_of_range_efficiency_rejected() {
        assert!(SleepPerformanceEngine::calculate(7.0, 8.0, 1.2, 0.8).is_err());
        assert!(SleepPerformanceEngine::calculate(7.0, 8.0, 0.9, -0.1).is_err());
    }

    #[test]
    fn test_deterministic() {
        let a = SleepPerformanceEngine::calculate(7.3, 8.0, 0.87, 0.64).unwrap();
        let b = SleepPerformanceEngine::calculate(7.3, 8.0, 0.87, 0.64).unwrap();
        assert_eq!(a, b);
    }
}
