//! Pipeline orchestration
//!
//! This module provides the public API for Recovery Flux. Scoring runs when a
//! new daily sample arrives, never as a side effect of reading results.
//!
//! Stages per day:
//! 1. BaselineEngine - trailing baselines up to the previous day
//! 2. DeviationCalculator - z-scores and percentiles for HRV and RHR
//! 3. ConsistencyCalculator - regularity of recent bed and wake times
//! 4. SleepPerformanceEngine, RecoveryScoreEngine, StrainScoreEngine

use crate::baseline::{BaselineCache, BaselineEngine};
use crate::config::FluxConfig;
use crate::consistency::{trailing_nights, ConsistencyCalculator};
use crate::deviation::DeviationCalculator;
use crate::error::ComputeError;
use crate::patterns::PatternDetector;
use crate::recovery::RecoveryScoreEngine;
use crate::schema::validate_sample;
use crate::sleep::SleepPerformanceEngine;
use crate::store::{InMemoryStore, ReportStore};
use crate::strain::StrainScoreEngine;
use crate::types::{
    Confidence, DailyRecord, DailyReport, DailySample, DeviationResult, GoalObservation,
    PatternReport, Signal, WeekSummary,
};
use crate::weekly::WeekAggregator;
use chrono::{Duration, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// All scoring engines built from one validated configuration
#[derive(Debug, Clone)]
pub struct DailyScorer {
    config: FluxConfig,
    baseline: BaselineEngine,
    recovery: RecoveryScoreEngine,
    strain: StrainScoreEngine,
    consistency: ConsistencyCalculator,
}

impl DailyScorer {
    pub fn new(config: FluxConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            baseline: BaselineEngine::from_config(&config.baseline),
            recovery: RecoveryScoreEngine::new(config.recovery_weights)?,
            strain: StrainScoreEngine::new(config.strain.clone())?,
            consistency: ConsistencyCalculator::new(&config.consistency),
            config,
        })
    }

    pub fn config(&self) -> &FluxConfig {
        &self.config
    }

    /// Score `date` against `history`.
    ///
    /// Baselines end the day before `date`, so a day is never compared with
    /// itself. `history` need not be sorted but must contain `date`.
    pub fn score_day(
        &self,
        history: &[DailySample],
        date: NaiveDate,
        cache: &mut BaselineCache,
    ) -> Result<DailyReport, ComputeError> {
        let sample = history
            .iter()
            .find(|s| s.date == date)
            .ok_or_else(|| ComputeError::InvalidInput(format!("no daily sample for {date}")))?;
        let as_of = date - Duration::days(1);
        let baselines = &self.config.baseline;

        let hrv_deviation = sample.hrv_ms.map(|value| {
            let window = baselines.window_days(baselines.hrv_window);
            let baseline =
                cache.get_or_compute(&self.baseline, Signal::Hrv, history, as_of, window);
            DeviationCalculator::deviation(value, &baseline)
        });
        let rhr_deviation = sample.resting_hr_bpm.map(|value| {
            let window = baselines.window_days(baselines.rhr_window);
            let baseline =
                cache.get_or_compute(&self.baseline, Signal::RestingHr, history, as_of, window);
            DeviationCalculator::deviation(value, &baseline)
        });

        let nights = trailing_nights(history, date, self.config.sleep.consistency_window_nights);
        let consistency = self.consistency.calculate(&nights);

        let sleep = match (sample.sleep_hours, sample.sleep_efficiency) {
            (Some(hours), Some(efficiency)) => Some(SleepPerformanceEngine::calculate(
                hours,
                self.config.sleep.hours_needed,
                efficiency,
                consistency.consistency_score,
            )?),
            _ => None,
        };

        let recovery = self
            .recovery
            .calculate(
                hrv_deviation.map(|d| d.percentile),
                rhr_deviation.map(|d| d.percentile),
                sleep.as_ref().map(|s| s.score),
            )
            .map(|score| score.cap_confidence(weakest(&[hrv_deviation, rhr_deviation])));

        let strain = self
            .strain
            .calculate(&sample.zone_minutes, sample.active_energy_kcal)?;

        debug!(
            %date,
            recovery = recovery.as_ref().map(|r| r.score),
            strain = strain.value,
            sleep = sleep.as_ref().map(|s| s.score),
            "scored day"
        );

        Ok(DailyReport {
            date,
            hrv_deviation,
            rhr_deviation,
            recovery,
            strain,
            sleep,
            consistency,
        })
    }
}

/// Lowest confidence among the deviations that were used
fn weakest(deviations: &[Option<DeviationResult>]) -> Confidence {
    deviations
        .iter()
        .flatten()
        .map(|d| d.confidence)
        .min()
        .unwrap_or(Confidence::High)
}

/// Score a single day with a fresh cache
pub fn score_day(
    config: &FluxConfig,
    history: &[DailySample],
    date: NaiveDate,
) -> Result<DailyReport, ComputeError> {
    DailyScorer::new(config.clone())?.score_day(history, date, &mut BaselineCache::new())
}

/// Stateful processor holding the sample history and a report store.
///
/// Use this when samples arrive one day at a time.
pub struct FluxProcessor<S: ReportStore = InMemoryStore> {
    scorer: DailyScorer,
    detector: PatternDetector,
    weeks: WeekAggregator,
    history: Vec<DailySample>,
    cache: BaselineCache,
    store: S,
}

impl FluxProcessor<InMemoryStore> {
    /// Create a processor with an in-memory store
    pub fn new(config: FluxConfig) -> Result<Self, ComputeError> {
        Self::with_store(config, InMemoryStore::new())
    }
}

impl<S: ReportStore> FluxProcessor<S> {
    pub fn with_store(config: FluxConfig, store: S) -> Result<Self, ComputeError> {
        let detector = PatternDetector::new(config.patterns.clone());
        let weeks = WeekAggregator::new(&config.week);
        Ok(Self {
            scorer: DailyScorer::new(config)?,
            detector,
            weeks,
            history: Vec::new(),
            cache: BaselineCache::new(),
            store,
        })
    }

    pub fn config(&self) -> &FluxConfig {
        self.scorer.config()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn history(&self) -> &[DailySample] {
        &self.history
    }

    /// Accept a new day's sample and score it.
    ///
    /// Samples are immutable once captured: a second sample for a date is
    /// rejected. A late-arriving sample also rescores the later days whose
    /// baselines or consistency window it falls into. The new report and
    /// every rescored one reach the store in a single write; if scoring or
    /// that write fails, the sample is not kept and the call can be retried.
    pub fn ingest(&mut self, sample: DailySample) -> Result<DailyReport, ComputeError> {
        validate_sample(&sample).map_err(|e| ComputeError::InvalidInput(e.to_string()))?;

        let date = sample.date;
        let position = match self.history.binary_search_by_key(&date, |s| s.date) {
            Ok(_) => return Err(ComputeError::DuplicateSample(date)),
            Err(position) => position,
        };
        self.history.insert(position, sample);
        self.cache.invalidate_from(date);

        match self.score_and_store(position, date) {
            Ok(report) => Ok(report),
            Err(e) => {
                warn!(%date, error = %e, "ingest failed, sample discarded");
                self.history.remove(position);
                self.cache.invalidate_from(date);
                Err(e)
            }
        }
    }

    /// Score the day at `position` and every later day, then store them together
    fn score_and_store(
        &mut self,
        position: usize,
        date: NaiveDate,
    ) -> Result<DailyReport, ComputeError> {
        let report = self.scorer.score_day(&self.history, date, &mut self.cache)?;

        let later = &self.history[position + 1..];
        if !later.is_empty() {
            info!(%date, rescored = later.len(), "late sample, rescoring later days");
        }
        let mut reports = Vec::with_capacity(later.len() + 1);
        reports.push(report.clone());
        for sample in later {
            reports.push(self.scorer.score_day(&self.history, sample.date, &mut self.cache)?);
        }

        self.store.put_reports(reports)?;
        Ok(report)
    }

    /// Ingest several samples in date order.
    ///
    /// Stops at the first failure; samples before it stay ingested.
    pub fn ingest_all(
        &mut self,
        mut samples: Vec<DailySample>,
    ) -> Result<Vec<DailyReport>, ComputeError> {
        samples.sort_by_key(|s| s.date);
        samples.into_iter().map(|s| self.ingest(s)).collect()
    }

    /// Samples joined with their stored reports, oldest first
    pub fn records(&self) -> Vec<DailyRecord> {
        self.history
            .iter()
            .map(|sample| DailyRecord {
                sample: sample.clone(),
                report: self.store.report(sample.date),
            })
            .collect()
    }

    /// Run pattern detection over the full history; the new report
    /// supersedes the previous one in the store
    pub fn detect_patterns(
        &mut self,
        goals: &[GoalObservation],
    ) -> Result<PatternReport, ComputeError> {
        let patterns = self.detector.scan(&self.records(), goals)?;
        let report = PatternReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            patterns,
        };
        info!(
            run_id = %report.run_id,
            patterns = report.patterns.len(),
            "pattern detection complete"
        );
        self.store.put_patterns(report.clone())?;
        Ok(report)
    }

    /// Weekly rollups of everything ingested so far
    pub fn weekly_summaries(&self) -> Result<Vec<WeekSummary>, ComputeError> {
        self.weeks.aggregate_all(&self.records())
    }
}
