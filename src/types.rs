//! Core types for the Recovery Flux pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: daily samples, baselines, deviations, composite scores, detected
//! patterns and weekly rollups. All of them are plain immutable values.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Physiological signal a baseline can be computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    Hrv,
    RestingHr,
    SleepHours,
    SleepEfficiency,
    ActiveEnergy,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Signal::Hrv => "hrv",
            Signal::RestingHr => "resting_hr",
            Signal::SleepHours => "sleep_hours",
            Signal::SleepEfficiency => "sleep_efficiency",
            Signal::ActiveEnergy => "active_energy",
        }
    }

    /// Read this signal from a daily sample; absent values stay absent
    pub fn value_of(&self, sample: &DailySample) -> Option<f64> {
        match self {
            Signal::Hrv => sample.hrv_ms,
            Signal::RestingHr => sample.resting_hr_bpm,
            Signal::SleepHours => sample.sleep_hours,
            Signal::SleepEfficiency => sample.sleep_efficiency,
            Signal::ActiveEnergy => Some(sample.active_energy_kcal),
        }
    }
}

/// Heart-rate zone, lightest to heaviest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HrZone {
    Zone1,
    Zone2,
    Zone3,
    Zone4,
    Zone5,
}

impl HrZone {
    pub const ALL: [HrZone; 5] = [
        HrZone::Zone1,
        HrZone::Zone2,
        HrZone::Zone3,
        HrZone::Zone4,
        HrZone::Zone5,
    ];

    /// Zero-based position used to index weight tables
    pub fn index(&self) -> usize {
        match self {
            HrZone::Zone1 => 0,
            HrZone::Zone2 => 1,
            HrZone::Zone3 => 2,
            HrZone::Zone4 => 3,
            HrZone::Zone5 => 4,
        }
    }
}

/// One calendar day of raw inputs.
///
/// Missing signals are `None`, never zero. Zone minutes and active energy
/// default to zero because a rest day legitimately has no load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailySample {
    /// Calendar date this sample represents
    pub date: NaiveDate,
    /// Heart rate variability (ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hrv_ms: Option<f64>,
    /// Resting heart rate (bpm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resting_hr_bpm: Option<f64>,
    /// Total sleep (hours)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_hours: Option<f64>,
    /// Sleep efficiency (0-1)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_efficiency: Option<f64>,
    /// Local bedtime (time of day)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bedtime: Option<NaiveTime>,
    /// Local wake time (time of day)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wake_time: Option<NaiveTime>,
    /// Minutes spent in each heart-rate zone
    #[serde(default)]
    pub zone_minutes: BTreeMap<HrZone, f64>,
    /// Active energy (kcal)
    #[serde(default)]
    pub active_energy_kcal: f64,
}

impl DailySample {
    /// Create an empty sample for a date
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            hrv_ms: None,
            resting_hr_bpm: None,
            sleep_hours: None,
            sleep_efficiency: None,
            bedtime: None,
            wake_time: None,
            zone_minutes: BTreeMap::new(),
            active_energy_kcal: 0.0,
        }
    }

    /// Bedtime and wake time, when both were captured
    pub fn night(&self) -> Option<SleepNight> {
        match (self.bedtime, self.wake_time) {
            (Some(bedtime), Some(wake_time)) => Some(SleepNight { bedtime, wake_time }),
            _ => None,
        }
    }
}

/// Clock times of a single night's sleep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepNight {
    pub bedtime: NaiveTime,
    pub wake_time: NaiveTime,
}

/// User-defined goal or habit observation (e.g. "caffeine after 2pm" = 1.0)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalObservation {
    pub date: NaiveDate,
    pub goal_id: String,
    pub value: f64,
}

/// Which trailing window a baseline is computed over
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BaselineWindow {
    Short,
    Long,
}

/// Rolling statistic for one signal over a trailing window ending at `as_of`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Baseline {
    pub signal: Signal,
    /// Window length in calendar days
    pub window_days: u32,
    /// Last day included in the window
    pub as_of: NaiveDate,
    /// Days with a present value inside the window
    pub sample_count: u32,
    pub mean: f64,
    /// Population standard deviation, always >= 0
    pub std_dev: f64,
    /// False when fewer than the minimum samples were available
    pub valid: bool,
}

impl Baseline {
    pub fn is_valid(&self) -> bool {
        self.valid
    }
}

/// Confidence attached to derived values
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// Position of a day's value relative to its baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviationResult {
    pub z_score: f64,
    /// (value - mean) / mean, as a fraction
    pub percent_deviation: f64,
    /// |z| <= 1.0
    pub in_range: bool,
    /// Standard-normal percentile of the z-score (0-100)
    pub percentile: f64,
    pub confidence: Confidence,
}

/// One weighted input of a composite score, kept for breakdown display
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreComponent {
    pub name: String,
    /// Effective weight after renormalization (0-1)
    pub weight: f64,
    pub raw_value: f64,
    /// Value on the 0-100 scale
    pub normalized_value: f64,
    /// weight * normalized_value
    pub contribution: f64,
}

impl ScoreComponent {
    pub fn new(name: &str, weight: f64, raw_value: f64, normalized_value: f64) -> Self {
        Self {
            name: name.to_string(),
            weight,
            raw_value,
            normalized_value,
            contribution: weight * normalized_value,
        }
    }
}

/// Recovery category bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecoveryCategory {
    Low,
    Moderate,
    Optimal,
}

impl RecoveryCategory {
    /// Low <= 33, Moderate 34-66, Optimal >= 67
    pub fn from_score(score: u8) -> Self {
        match score {
            0..=33 => RecoveryCategory::Low,
            34..=66 => RecoveryCategory::Moderate,
            _ => RecoveryCategory::Optimal,
        }
    }
}

/// Composite 0-100 recovery score
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryScore {
    pub score: u8,
    pub category: RecoveryCategory,
    /// Ordered: HRV deviation, RHR deviation, sleep performance (absent ones omitted)
    pub components: Vec<ScoreComponent>,
    pub confidence: Confidence,
}

impl RecoveryScore {
    /// Lower the confidence to at most `ceiling`
    pub fn cap_confidence(mut self, ceiling: Confidence) -> Self {
        self.confidence = self.confidence.min(ceiling);
        self
    }
}

/// Cardiovascular load on the canonical 0-21 scale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrainScore {
    pub value: f64,
    pub scale_max: f64,
    /// Ordered: HR-zone load, active-energy load
    pub components: Vec<ScoreComponent>,
    /// True when the uncapped load exceeded `scale_max`
    pub capped: bool,
}

impl StrainScore {
    /// Convert to the 0-100 presentation scale
    pub fn normalized(&self) -> f64 {
        if self.scale_max <= 0.0 {
            return 0.0;
        }
        (self.value / self.scale_max * 100.0).clamp(0.0, 100.0)
    }
}

/// Sleep sub-score with its inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepPerformanceScore {
    /// 0-100
    pub score: f64,
    /// hours slept / hours needed, capped at 1.5 (not at 1.0)
    pub hours_vs_need: f64,
    pub efficiency: f64,
    pub consistency: f64,
    pub components: Vec<ScoreComponent>,
}

/// Bedtime and wake-time regularity over recent nights
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConsistencyMetrics {
    /// Standard deviation of bedtime, in seconds
    pub bedtime_variance_sec: f64,
    /// Standard deviation of wake time, in seconds
    pub wake_time_variance_sec: f64,
    /// 0-1, 1 = perfectly regular
    pub consistency_score: f64,
    pub nights: u32,
    pub insufficient_data: bool,
}

/// Metric a pattern series is drawn from
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Hrv,
    RestingHr,
    SleepHours,
    SleepEfficiency,
    ActiveEnergy,
    Recovery,
    Strain,
    SleepPerformance,
    Goal(String),
}

impl Metric {
    /// Human-readable label for descriptions
    pub fn label(&self) -> String {
        match self {
            Metric::Hrv => "HRV".to_string(),
            Metric::RestingHr => "resting heart rate".to_string(),
            Metric::SleepHours => "sleep duration".to_string(),
            Metric::SleepEfficiency => "sleep efficiency".to_string(),
            Metric::ActiveEnergy => "active energy".to_string(),
            Metric::Recovery => "recovery".to_string(),
            Metric::Strain => "strain".to_string(),
            Metric::SleepPerformance => "sleep performance".to_string(),
            Metric::Goal(id) => id.replace('_', " "),
        }
    }

    /// Whether a higher value of this metric is the desirable direction
    pub fn higher_is_better(&self) -> bool {
        !matches!(self, Metric::RestingHr)
    }
}

/// Confidence bucket for a correlation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternConfidence {
    None,
    Low,
    Medium,
    High,
}

/// A reportable correlation between two daily series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedPattern {
    pub metric_a: Metric,
    pub metric_b: Metric,
    /// Days series A is shifted forward before alignment
    pub lag_days: u32,
    /// Pearson r in [-1, 1]
    pub correlation: f64,
    pub sample_size: usize,
    pub confidence: PatternConfidence,
    pub description: String,
    pub recommendation: String,
}

/// Output of one pattern-detection run; a later run supersedes it whole
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    pub run_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub patterns: Vec<DetectedPattern>,
}

/// Per-day output of the scoring pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    pub date: NaiveDate,
    pub hrv_deviation: Option<DeviationResult>,
    pub rhr_deviation: Option<DeviationResult>,
    pub recovery: Option<RecoveryScore>,
    pub strain: StrainScore,
    pub sleep: Option<SleepPerformanceScore>,
    pub consistency: ConsistencyMetrics,
}

/// A day's raw sample together with its computed scores
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub sample: DailySample,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report: Option<DailyReport>,
}

impl DailyRecord {
    pub fn date(&self) -> NaiveDate {
        self.sample.date
    }

    /// Value of a metric for this day, if present
    pub fn metric(&self, metric: &Metric) -> Option<f64> {
        match metric {
            Metric::Hrv => self.sample.hrv_ms,
            Metric::RestingHr => self.sample.resting_hr_bpm,
            Metric::SleepHours => self.sample.sleep_hours,
            Metric::SleepEfficiency => self.sample.sleep_efficiency,
            Metric::ActiveEnergy => Some(self.sample.active_energy_kcal),
            Metric::Recovery => self
                .report
                .as_ref()
                .and_then(|r| r.recovery.as_ref())
                .map(|r| f64::from(r.score)),
            Metric::Strain => self.report.as_ref().map(|r| r.strain.value),
            Metric::SleepPerformance => self
                .report
                .as_ref()
                .and_then(|r| r.sleep.as_ref())
                .map(|s| s.score),
            Metric::Goal(_) => None,
        }
    }
}

/// Mean of a metric over the days that had it
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricAverage {
    pub mean: f64,
    /// Number of days that contributed
    pub days: u32,
}

/// Calendar-week rollup; absent metrics had no qualifying day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeekSummary {
    pub week_start: NaiveDate,
    pub records: Vec<DailyRecord>,
    pub hrv: Option<MetricAverage>,
    pub resting_hr: Option<MetricAverage>,
    pub sleep_hours: Option<MetricAverage>,
    pub sleep_efficiency: Option<MetricAverage>,
    pub active_energy: Option<MetricAverage>,
    pub recovery: Option<MetricAverage>,
    pub strain: Option<MetricAverage>,
    pub sleep_performance: Option<MetricAverage>,
}
