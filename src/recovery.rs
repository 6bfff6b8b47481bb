//! Recovery score
//!
//! Combines HRV deviation, resting heart rate deviation and sleep performance
//! into a 0-100 score. Missing components are dropped and the remaining
//! weights renormalized, with confidence lowered accordingly.

use crate::config::RecoveryWeights;
use crate::error::ComputeError;
use crate::types::{Confidence, RecoveryCategory, RecoveryScore, ScoreComponent};
use tracing::{debug, warn};

pub const HRV_COMPONENT: &str = "hrv_deviation";
pub const RHR_COMPONENT: &str = "rhr_deviation";
pub const SLEEP_COMPONENT: &str = "sleep_performance";

/// Recovery score calculator
#[derive(Debug, Clone)]
pub struct RecoveryScoreEngine {
    weights: RecoveryWeights,
}

impl Default for RecoveryScoreEngine {
    fn default() -> Self {
        Self {
            weights: RecoveryWeights::default(),
        }
    }
}

impl RecoveryScoreEngine {
    /// Create an engine; rejects weight tables that do not sum to 1.0
    pub fn new(weights: RecoveryWeights) -> Result<Self, ComputeError> {
        weights.validate()?;
        Ok(Self { weights })
    }

    /// Compute the recovery score.
    ///
    /// `hrv_percentile` and `rhr_percentile` are deviation percentiles (0-100);
    /// a low RHR percentile is favorable, so it enters inverted.
    /// Returns `None` when no component is present.
    pub fn calculate(
        &self,
        hrv_percentile: Option<f64>,
        rhr_percentile: Option<f64>,
        sleep_performance: Option<f64>,
    ) -> Option<RecoveryScore> {
        let candidates = [
            (HRV_COMPONENT, self.weights.hrv, present(hrv_percentile), false),
            (RHR_COMPONENT, self.weights.rhr, present(rhr_percentile), true),
            (SLEEP_COMPONENT, self.weights.sleep, present(sleep_performance), false),
        ];

        let included: Vec<_> = candidates
            .iter()
            .filter_map(|(name, weight, value, inverted)| {
                value.map(|v| (*name, *weight, v, *inverted))
            })
            .collect();

        let weight_sum: f64 = included.iter().map(|(_, w, _, _)| w).sum();
        if included.is_empty() || weight_sum <= 0.0 {
            debug!("no recovery components available");
            return None;
        }

        let excluded = candidates.len() - included.len();
        if excluded > 0 {
            warn!(excluded, "recovery components missing, renormalizing weights");
        }

        let components: Vec<ScoreComponent> = included
            .iter()
            .map(|(name, weight, raw, inverted)| {
                let clamped = raw.clamp(0.0, 100.0);
                let normalized = if *inverted { 100.0 - clamped } else { clamped };
                ScoreComponent::new(name, weight / weight_sum, *raw, normalized)
            })
            .collect();

        let total: f64 = components.iter().map(|c| c.contribution).sum();
        let score = total.round().clamp(0.0, 100.0) as u8;

        let confidence = match included.len() {
            3 => Confidence::High,
            2 => Confidence::Medium,
            _ => Confidence::Low,
        };

        Some(RecoveryScore {
            score,
            category: RecoveryCategory::from_score(score),
            components,
            confidence,
        })
    }
}

fn present(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reference_scenario() {
        let engine = RecoveryScoreEngine::default();
        let score = engine.calculate(Some(80.0), Some(20.0), Some(90.0)).unwrap();

        assert_eq!(score.score, 82);
        assert_eq!(score.category, RecoveryCategory::Optimal);
        assert_eq!(score.confidence, Confidence::High);
        let names: Vec<&str> = score.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec![HRV_COMPONENT, RHR_COMPONENT, SLEEP_COMPONENT]);
        assert!((score.components[1].normalized_value - 80.0).abs() < 1e-9);
    }

    #[test]
    fn test_score_bounded_at_extremes() {
        let engine = RecoveryScoreEngine::default();
        for hrv in [0.0, 100.0] {
            for rhr in [0.0, 100.0] {
                for sleep in [0.0, 100.0] {
                    let score = engine.calculate(Some(hrv), Some(rhr), Some(sleep)).unwrap();
                    assert!(score.score <= 100);
                }
            }
        }
        let best = engine.calculate(Some(100.0), Some(0.0), Some(100.0)).unwrap();
        assert_eq!(best.score, 100);
        let worst = engine.calculate(Some(0.0), Some(100.0), Some(0.0)).unwrap();
        assert_eq!(worst.score, 0);
    }

    #[test]
    fn test_out_of_range_inputs_are_clamped() {
        let engine = RecoveryScoreEngine::default();
        let score = engine.calculate(Some(250.0), Some(-40.0), Some(400.0)).unwrap();
        assert_eq!(score.score, 100);
    }

    #[test]
    fn test_category_boundaries() {
        assert_eq!(RecoveryCategory::from_score(33), RecoveryCategory::Low);
        assert_eq!(RecoveryCategory::from_score(34), RecoveryCategory::Moderate);
        assert_eq!(RecoveryCategory::from_score(66), RecoveryCategory::Moderate);
        assert_eq!(RecoveryCategory::from_score(67), RecoveryCategory::Optimal);
    }

    #[test]
    fn test_missing_component_renormalizes() {
        let engine = RecoveryScoreEngine::default();
        // Sleep missing: weights become 0.625 / 0.375
        let score = engine.calculate(Some(80.0), Some(20.0), None).unwrap();

        assert_eq!(score.score, 80);
        assert_eq!(score.confidence, Confidence::Medium);
        assert_eq!(score.components.len(), 2);
        let weight_sum: f64 = score.components.iter().map(|c| c.weight).sum();
        assert!((weight_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_component_is_low_confidence() {
        let engine = RecoveryScoreEngine::default();
        let score = engine.calculate(None, None, Some(45.0)).unwrap();
        assert_eq!(score.score, 45);
        assert_eq!(score.confidence, Confidence::Low);
    }

    #[test]
    fn test_all_missing_yields_none() {
        let engine = RecoveryScoreEngine::default();
        assert!(engine.calculate(None, None, None).is_none());
        assert!(engine.calculate(Some(f64::NAN), None, None).is_none());
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let result = RecoveryScoreEngine::new(RecoveryWeights {
            hrv: 0.6,
            rhr: 0.6,
            sleep: 0.2,
        });
        assert!(matches!(result, Err(ComputeError::InvalidConfig(_))));
    }

    #[test]
    fn test_deterministic() {
        let engine = RecoveryScoreEngine::default();
        let a = engine.calculate(Some(63.2), Some(41.7), Some(77.1));
        let b = engine.calculate(Some(63.2), Some(41.7), Some(77.1));
        assert_eq!(a, b);
    }
}
