//! Sleep schedule consistency
//!
//! Measures how regular bedtimes and wake times are across recent nights.
//! Times are compared as clock time, so 23:30 and 00:30 are one hour apart.

use crate::baseline::mean_and_std_dev;
use crate::config::ConsistencyConfig;
use crate::types::{ConsistencyMetrics, DailySample, SleepNight};
use chrono::{Duration, NaiveDate, NaiveTime, Timelike};
use tracing::debug;

const SECONDS_PER_DAY: i64 = 86_400;
const HALF_DAY_SECONDS: i64 = SECONDS_PER_DAY / 2;

/// Consistency calculator
#[derive(Debug, Clone)]
pub struct ConsistencyCalculator {
    max_variance_hours: f64,
    min_nights: u32,
}

impl Default for ConsistencyCalculator {
    fn default() -> Self {
        Self::new(&ConsistencyConfig::default())
    }
}

impl ConsistencyCalculator {
    pub fn new(config: &ConsistencyConfig) -> Self {
        Self {
            max_variance_hours: config.max_variance_hours,
            min_nights: config.min_nights,
        }
    }

    /// Score the regularity of `nights`.
    ///
    /// Fewer than `min_nights` nights returns `insufficient_data` with a
    /// neutral score of 1.0.
    pub fn calculate(&self, nights: &[SleepNight]) -> ConsistencyMetrics {
        let count = nights.len() as u32;
        if count < self.min_nights {
            debug!(nights = count, "not enough nights for consistency");
            return ConsistencyMetrics {
                bedtime_variance_sec: 0.0,
                wake_time_variance_sec: 0.0,
                consistency_score: 1.0,
                nights: count,
                insufficient_data: true,
            };
        }

        let bedtimes: Vec<NaiveTime> = nights.iter().map(|n| n.bedtime).collect();
        let wake_times: Vec<NaiveTime> = nights.iter().map(|n| n.wake_time).collect();

        let bedtime_variance_sec = clock_std_dev_seconds(&bedtimes);
        let wake_time_variance_sec = clock_std_dev_seconds(&wake_times);

        let total_variance_hours = (bedtime_variance_sec + wake_time_variance_sec) / 3600.0;
        let consistency_score =
            (1.0 - total_variance_hours / self.max_variance_hours).clamp(0.0, 1.0);

        ConsistencyMetrics {
            bedtime_variance_sec,
            wake_time_variance_sec,
            consistency_score,
            nights: count,
            insufficient_data: false,
        }
    }
}

/// Nights with both bedtime and wake time in `(as_of - window_nights, as_of]`, oldest first
pub fn trailing_nights(
    history: &[DailySample],
    as_of: NaiveDate,
    window_nights: u32,
) -> Vec<SleepNight> {
    let window_start = as_of - Duration::days(i64::from(window_nights));
    let mut dated: Vec<(NaiveDate, SleepNight)> = history
        .iter()
        .filter(|s| s.date > window_start && s.date <= as_of)
        .filter_map(|s| s.night().map(|n| (s.date, n)))
        .collect();
    dated.sort_by_key(|(date, _)| *date);
    dated.into_iter().map(|(_, night)| night).collect()
}

/// Standard deviation of clock times in seconds.
///
/// Each time is expressed as a signed offset from the first one, wrapped
/// into [-12h, 12h), so a spread across midnight stays contiguous.
fn clock_std_dev_seconds(times: &[NaiveTime]) -> f64 {
    let Some(first) = times.first() else {
        return 0.0;
    };
    let reference = i64::from(first.num_seconds_from_midnight());

    let offsets: Vec<f64> = times
        .iter()
        .map(|t| {
            let delta = i64::from(t.num_seconds_from_midnight()) - reference;
            ((delta + HALF_DAY_SECONDS).rem_euclid(SECONDS_PER_DAY) - HALF_DAY_SECONDS) as f64
        })
        .collect();

    mean_and_std_dev(&offsets).1
}
