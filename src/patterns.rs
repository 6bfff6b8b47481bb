//! Pattern detection
//!
//! Pearson correlation between two daily series, aligned by date, bucketed by
//! strength and sample size. Only correlations of at least low confidence are
//! reported; absence of a pattern is `None`, not an error.

use crate::config::PatternConfig;
use crate::error::ComputeError;
use crate::types::{DailyRecord, DetectedPattern, GoalObservation, Metric, PatternConfidence};
use chrono::{Duration, NaiveDate};
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Outcome metrics each goal is correlated against during a scan
pub const SCAN_OUTCOMES: [Metric; 6] = [
    Metric::Recovery,
    Metric::Hrv,
    Metric::RestingHr,
    Metric::SleepHours,
    Metric::SleepEfficiency,
    Metric::SleepPerformance,
];

/// Physiological pairs checked on every scan, independent of goals
pub const CORE_PAIRS: [(Metric, Metric); 3] = [
    (Metric::Strain, Metric::Recovery),
    (Metric::SleepHours, Metric::Recovery),
    (Metric::ActiveEnergy, Metric::SleepHours),
];

/// A daily series for one metric
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub metric: Metric,
    pub points: Vec<(NaiveDate, f64)>,
}

impl MetricSeries {
    pub fn new(metric: Metric, points: Vec<(NaiveDate, f64)>) -> Self {
        Self { metric, points }
    }

    /// Series of a metric across daily records, skipping days without a value
    pub fn from_records(metric: Metric, records: &[DailyRecord]) -> Self {
        let points = records
            .iter()
            .filter_map(|r| r.metric(&metric).map(|v| (r.date(), v)))
            .collect();
        Self { metric, points }
    }

    /// Series of one goal's observations
    pub fn from_goals(goal_id: &str, goals: &[GoalObservation]) -> Self {
        let points = goals
            .iter()
            .filter(|g| g.goal_id == goal_id)
            .map(|g| (g.date, g.value))
            .collect();
        Self {
            metric: Metric::Goal(goal_id.to_string()),
            points,
        }
    }
}

/// Correlation-based pattern detector
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    config: PatternConfig,
}

impl PatternDetector {
    pub fn new(config: PatternConfig) -> Self {
        Self { config }
    }

    /// Correlate two series on the same day
    pub fn detect(&self, a: &MetricSeries, b: &MetricSeries) -> Option<DetectedPattern> {
        self.detect_lagged(a, b, 0)
    }

    /// Correlate series A on day `d` with series B on day `d + lag_days`
    pub fn detect_lagged(
        &self,
        a: &MetricSeries,
        b: &MetricSeries,
        lag_days: u32,
    ) -> Option<DetectedPattern> {
        let pairs = align(&a.points, &b.points, lag_days);
        let n = pairs.len();
        if n < self.config.min_sample_size {
            debug!(
                a = %a.metric.label(),
                b = %b.metric.label(),
                n,
                "too few aligned days for correlation"
            );
            return None;
        }

        let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        let r = pearson(&xs, &ys);
        let confidence = self.classify(r, n);
        if confidence == PatternConfidence::None {
            return None;
        }

        Some(DetectedPattern {
            metric_a: a.metric.clone(),
            metric_b: b.metric.clone(),
            lag_days,
            correlation: r,
            sample_size: n,
            confidence,
            description: describe(&a.metric, &b.metric, lag_days, r, n),
            recommendation: recommend(&a.metric, &b.metric, r),
        })
    }

    /// Bucket a correlation; `High` additionally needs enough samples
    pub fn classify(&self, r: f64, n: usize) -> PatternConfidence {
        let t = &self.config.thresholds;
        let strength = r.abs();
        if strength < t.low {
            PatternConfidence::None
        } else if strength < t.medium {
            PatternConfidence::Low
        } else if strength <= t.high || n < self.config.high_confidence_min_samples {
            PatternConfidence::Medium
        } else {
            PatternConfidence::High
        }
    }

    /// Correlate every goal against the outcome metrics, plus the core
    /// physiological pairs, at each configured lag.
    ///
    /// Results are ordered strongest first. A goal observed twice on the
    /// same date is rejected rather than collapsed to one value.
    pub fn scan(
        &self,
        records: &[DailyRecord],
        goals: &[GoalObservation],
    ) -> Result<Vec<DetectedPattern>, ComputeError> {
        ensure_unique_goals(goals)?;
        let goal_ids: BTreeSet<&str> = goals.iter().map(|g| g.goal_id.as_str()).collect();
        let outcomes: Vec<MetricSeries> = SCAN_OUTCOMES
            .iter()
            .map(|m| MetricSeries::from_records(m.clone(), records))
            .collect();

        let mut patterns = Vec::new();
        for goal_id in goal_ids {
            let goal_series = MetricSeries::from_goals(goal_id, goals);
            for outcome in &outcomes {
                for lag in &self.config.scan_lags {
                    patterns.extend(self.detect_lagged(&goal_series, outcome, *lag));
                }
            }
        }

        for (a, b) in CORE_PAIRS.iter() {
            let series_a = MetricSeries::from_records(a.clone(), records);
            let series_b = MetricSeries::from_records(b.clone(), records);
            for lag in &self.config.scan_lags {
                patterns.extend(self.detect_lagged(&series_a, &series_b, *lag));
            }
        }

        patterns.sort_by(|x, y| {
            y.correlation
                .abs()
                .total_cmp(&x.correlation.abs())
                .then(y.sample_size.cmp(&x.sample_size))
        });
        Ok(patterns)
    }
}

/// Reject a second observation of the same goal on the same date
pub fn ensure_unique_goals(goals: &[GoalObservation]) -> Result<(), ComputeError> {
    let mut seen = BTreeSet::new();
    for goal in goals {
        if !seen.insert((goal.goal_id.as_str(), goal.date)) {
            return Err(ComputeError::DuplicateGoalObservation {
                goal_id: goal.goal_id.clone(),
                date: goal.date,
            });
        }
    }
    Ok(())
}

/// Inner join on date after shifting A forward by `lag_days`
pub fn align(a: &[(NaiveDate, f64)], b: &[(NaiveDate, f64)], lag_days: u32) -> Vec<(f64, f64)> {
    let lag = Duration::days(i64::from(lag_days));
    let a_by_date: BTreeMap<NaiveDate, f64> = a
        .iter()
        .filter(|(_, v)| v.is_finite())
        .map(|(d, v)| (*d + lag, *v))
        .collect();
    let b_by_date: BTreeMap<NaiveDate, f64> =
        b.iter().filter(|(_, v)| v.is_finite()).copied().collect();

    a_by_date
        .iter()
        .filter_map(|(date, x)| b_by_date.get(date).map(|y| (*x, *y)))
        .collect()
}

/// Spread below this fraction of a series' sum of squares is rounding noise
const RELATIVE_VARIANCE_EPSILON: f64 = 1e-12;

/// Pearson correlation coefficient; 0 when either series has no variance.
///
/// Deviations are taken from the mean, and a spread that is only rounding
/// noise (a constant like 42.3 that binary floats cannot hold exactly)
/// counts as no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    let nf = n as f64;
    let (xs, ys) = (&xs[..n], &ys[..n]);

    let mean_x = xs.iter().sum::<f64>() / nf;
    let mean_y = ys.iter().sum::<f64>() / nf;

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let scale_x: f64 = xs.iter().map(|x| x * x).sum();
    let scale_y: f64 = ys.iter().map(|y| y * y).sum();
    if sxx <= RELATIVE_VARIANCE_EPSILON * scale_x || syy <= RELATIVE_VARIANCE_EPSILON * scale_y {
        return 0.0;
    }

    let denominator = (sxx * syy).sqrt();
    if !denominator.is_finite() || denominator <= 0.0 {
        return 0.0;
    }
    (sxy / denominator).clamp(-1.0, 1.0)
}

fn describe(a: &Metric, b: &Metric, lag_days: u32, r: f64, n: usize) -> String {
    let direction = if r > 0.0 { "higher" } else { "lower" };
    let stats = format!("(r = {r:.2}, n = {n})");
    match lag_days {
        0 => format!(
            "On days with higher {}, your {} tends to be {} {}.",
            a.label(),
            b.label(),
            direction,
            stats
        ),
        1 => format!(
            "After days with higher {}, your {} tends to be {} the next day {}.",
            a.label(),
            b.label(),
            direction,
            stats
        ),
        d => format!(
            "After days with higher {}, your {} tends to be {} {} days later {}.",
            a.label(),
            b.label(),
            direction,
            d,
            stats
        ),
    }
}

fn recommend(a: &Metric, b: &Metric, r: f64) -> String {
    let favorable = (r > 0.0) == b.higher_is_better();
    match (a, favorable) {
        (Metric::Goal(_), true) => format!(
            "Keep prioritizing {}: it is associated with better {}.",
            a.label(),
            b.label()
        ),
        (Metric::Goal(_), false) => format!(
            "Consider cutting back on {}: it is associated with worse {}.",
            a.label(),
            b.label()
        ),
        (_, true) => format!(
            "More {} has gone with better {} for you.",
            a.label(),
            b.label()
        ),
        (_, false) => format!(
            "Watch your {}: higher values have gone with worse {}.",
            a.label(),
            b.label()
        ),
    }
}
