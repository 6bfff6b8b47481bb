//! Strain score
//!
//! Zone-weighted heart-rate minutes plus active energy, capped at the scale
//! maximum (21 on the canonical scale). A rest day scores 0.

use crate::config::StrainConfig;
use crate::error::ComputeError;
use crate::types::{HrZone, ScoreComponent, StrainScore};
use std::collections::BTreeMap;
use tracing::debug;

pub const HR_ZONE_COMPONENT: &str = "hr_zone_load";
pub const ENERGY_COMPONENT: &str = "active_energy_load";

/// Strain score calculator
#[derive(Debug, Clone)]
pub struct StrainScoreEngine {
    config: StrainConfig,
}

impl Default for StrainScoreEngine {
    fn default() -> Self {
        Self {
            config: StrainConfig::default(),
        }
    }
}

impl StrainScoreEngine {
    pub fn new(config: StrainConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Intensity weight of a zone
    pub fn zone_weight(&self, zone: HrZone) -> f64 {
        self.config.zone_weights[zone.index()]
    }

    /// Compute strain for a day's zone minutes and active energy.
    ///
    /// Negative minutes or energy are contract violations.
    pub fn calculate(
        &self,
        zone_minutes: &BTreeMap<HrZone, f64>,
        active_energy_kcal: f64,
    ) -> Result<StrainScore, ComputeError> {
        if let Some((zone, minutes)) = zone_minutes
            .iter()
            .find(|(_, m)| !m.is_finite() || **m < 0.0)
        {
            return Err(ComputeError::InvalidInput(format!(
                "{zone:?} minutes must be a non-negative number, got {minutes}"
            )));
        }
        if !active_energy_kcal.is_finite() || active_energy_kcal < 0.0 {
            return Err(ComputeError::InvalidInput(format!(
                "active energy must be a non-negative number, got {active_energy_kcal}"
            )));
        }

        let weighted_minutes: f64 = zone_minutes
            .iter()
            .map(|(zone, minutes)| minutes * self.zone_weight(*zone))
            .sum();
        let hr_component = weighted_minutes / self.config.hr_normalization_factor;
        let energy_component = active_energy_kcal / self.config.energy_normalization_factor;

        let scale_max = self.config.scale_max;
        let raw = hr_component + energy_component;
        let capped = raw > scale_max;
        let value = raw.min(scale_max);

        if capped {
            debug!(raw, scale_max, "strain capped at scale maximum");
        }

        // Each component carries its share of the load, so contributions sum
        // to the capped strain on the 0-100 scale.
        let normalized_total = value / scale_max * 100.0;
        let components = vec![
            ScoreComponent::new(
                HR_ZONE_COMPONENT,
                share(hr_component, raw),
                weighted_minutes,
                normalized_total,
            ),
            ScoreComponent::new(
                ENERGY_COMPONENT,
                share(energy_component, raw),
                active_energy_kcal,
                normalized_total,
            ),
        ];

        Ok(StrainScore {
            value,
            scale_max,
            components,
            capped,
        })
    }
}

/// Fraction of the raw load a component accounts for
fn share(part: f64, total: f64) -> f64 {
    if total > 0.0 {
        part / total
    } else {
        0.0
    }
}
