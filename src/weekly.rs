//! Weekly rollups
//!
//! Groups daily records into fixed calendar weeks and averages each metric
//! over only the days that have it.

use crate::config::WeekConfig;
use crate::error::ComputeError;
use crate::types::{DailyRecord, Metric, MetricAverage, WeekSummary};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeMap;

/// Calendar-week aggregator
#[derive(Debug, Clone)]
pub struct WeekAggregator {
    first_day: Weekday,
}

impl Default for WeekAggregator {
    fn default() -> Self {
        Self::new(&WeekConfig::default())
    }
}

impl WeekAggregator {
    pub fn new(config: &WeekConfig) -> Self {
        Self {
            first_day: config.first_day,
        }
    }

    /// First day of the week containing `date`
    pub fn week_start_for(&self, date: NaiveDate) -> NaiveDate {
        let offset = (date.weekday().num_days_from_monday() + 7
            - self.first_day.num_days_from_monday())
            % 7;
        date - Duration::days(i64::from(offset))
    }

    /// Summarize the 7 days starting at `week_start`.
    ///
    /// `week_start` must fall on the configured first weekday.
    pub fn aggregate(
        &self,
        records: &[DailyRecord],
        week_start: NaiveDate,
    ) -> Result<WeekSummary, ComputeError> {
        let actual = week_start.weekday();
        if actual != self.first_day {
            return Err(ComputeError::UnalignedWeekStart {
                date: week_start,
                expected: self.first_day,
                actual,
            });
        }

        let week_end = week_start + Duration::days(7);
        let mut in_week: Vec<DailyRecord> = records
            .iter()
            .filter(|r| r.date() >= week_start && r.date() < week_end)
            .cloned()
            .collect();
        in_week.sort_by_key(|r| r.date());
        in_week.dedup_by_key(|r| r.date());

        Ok(WeekSummary {
            week_start,
            hrv: average(&in_week, &Metric::Hrv),
            resting_hr: average(&in_week, &Metric::RestingHr),
            sleep_hours: average(&in_week, &Metric::SleepHours),
            sleep_efficiency: average(&in_week, &Metric::SleepEfficiency),
            active_energy: average(&in_week, &Metric::ActiveEnergy),
            recovery: average(&in_week, &Metric::Recovery),
            strain: average(&in_week, &Metric::Strain),
            sleep_performance: average(&in_week, &Metric::SleepPerformance),
            records: in_week,
        })
    }

    /// Summaries for every week touched by `records`, oldest first
    pub fn aggregate_all(&self, records: &[DailyRecord]) -> Result<Vec<WeekSummary>, ComputeError> {
        let mut weeks: BTreeMap<NaiveDate, Vec<DailyRecord>> = BTreeMap::new();
        for record in records {
            weeks
                .entry(self.week_start_for(record.date()))
                .or_default()
                .push(record.clone());
        }

        weeks
            .iter()
            .map(|(start, week_records)| self.aggregate(week_records, *start))
            .collect()
    }
}

fn average(records: &[DailyRecord], metric: &Metric) -> Option<MetricAverage> {
    let values: Vec<f64> = records
        .iter()
        .filter_map(|r| r.metric(metric))
        .filter(|v| v.is_finite())
        .collect();
    if values.is_empty() {
        return None;
    }
    Some(MetricAverage {
        mean: values.iter().sum::<f64>() / values.len() as f64,
        days: values.len() as u32,
    })
}
