//! Baseline computation
//!
//! This module computes rolling baselines (mean and standard deviation) for
//! HRV, RHR, sleep and energy signals over a trailing calendar window.
//! Baselines enable relative interpretation of daily signals.

use crate::config::BaselineConfig;
use crate::types::{Baseline, BaselineWindow, DailySample, Signal};
use chrono::{Duration, NaiveDate};
use std::collections::HashMap;
use tracing::debug;

/// Default minimum number of days for a usable baseline
pub const DEFAULT_MIN_SAMPLES: u32 = 3;

/// Stateless baseline calculator
#[derive(Debug, Clone)]
pub struct BaselineEngine {
    min_samples: u32,
}

impl Default for BaselineEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_SAMPLES)
    }
}

impl BaselineEngine {
    /// Create an engine with the given validity threshold
    pub fn new(min_samples: u32) -> Self {
        Self { min_samples }
    }

    pub fn from_config(config: &BaselineConfig) -> Self {
        Self::new(config.min_samples)
    }

    /// Compute the baseline of `signal` over `(as_of - window_days, as_of]`.
    ///
    /// Days without a value are skipped, not zero-filled. With fewer than
    /// `min_samples` values the statistics are still reported but the
    /// baseline is marked invalid.
    pub fn compute_baseline(
        &self,
        signal: Signal,
        history: &[DailySample],
        as_of: NaiveDate,
        window_days: u32,
    ) -> Baseline {
        let window_start = as_of - Duration::days(i64::from(window_days));

        let values: Vec<f64> = history
            .iter()
            .filter(|s| s.date > window_start && s.date <= as_of)
            .filter_map(|s| signal.value_of(s))
            .filter(|v| v.is_finite())
            .collect();

        let sample_count = values.len() as u32;
        let (mean, std_dev) = mean_and_std_dev(&values);
        let valid = sample_count >= self.min_samples;

        if !valid {
            debug!(
                signal = signal.as_str(),
                %as_of,
                window_days,
                sample_count,
                "baseline below minimum sample count"
            );
        }

        Baseline {
            signal,
            window_days,
            as_of,
            sample_count,
            mean,
            std_dev,
            valid,
        }
    }
}

/// Population mean and standard deviation; (0, 0) for an empty slice
pub(crate) fn mean_and_std_dev(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.max(0.0).sqrt())
}

/// Memoized baselines keyed by (signal, window length, as-of date).
///
/// An entry is either absent or one complete `Baseline`. Entries are only
/// ever inserted whole or dropped; nothing is updated in place.
#[derive(Debug, Clone, Default)]
pub struct BaselineCache {
    entries: HashMap<(Signal, u32, NaiveDate), Baseline>,
}

impl BaselineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached baseline or compute and store it
    pub fn get_or_compute(
        &mut self,
        engine: &BaselineEngine,
        signal: Signal,
        history: &[DailySample],
        as_of: NaiveDate,
        window_days: u32,
    ) -> Baseline {
        *self
            .entries
            .entry((signal, window_days, as_of))
            .or_insert_with(|| engine.compute_baseline(signal, history, as_of, window_days))
    }

    /// Drop every entry whose window could contain `date`
    pub fn invalidate_from(&mut self, date: NaiveDate) {
        self.entries.retain(|(_, _, as_of), _| *as_of < date);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Short and long baselines for one signal, computed independently
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselinePair {
    pub short: Baseline,
    pub long: Baseline,
}

impl BaselinePair {
    pub fn compute(
        engine: &BaselineEngine,
        config: &BaselineConfig,
        signal: Signal,
        history: &[DailySample],
        as_of: NaiveDate,
    ) -> Self {
        Self {
            short: engine.compute_baseline(signal, history, as_of, config.short_window_days),
            long: engine.compute_baseline(signal, history, as_of, config.long_window_days),
        }
    }

    pub fn select(&self, window: BaselineWindow) -> &Baseline {
        match window {
            BaselineWindow::Short => &self.short,
            BaselineWindow::Long => &self.long,
        }
    }
}
