//! Report storage
//!
//! The engines never persist anything themselves; the processor hands its
//! outputs to a `ReportStore`. `InMemoryStore` is the reference backend.

use crate::error::ComputeError;
use crate::types::{DailyReport, PatternReport};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Repository for computed outputs
pub trait ReportStore {
    /// Insert or replace the report for its date
    fn put_report(&mut self, report: DailyReport) -> Result<(), ComputeError>;

    /// Insert or replace several reports as one unit: on error, none of
    /// them may be visible
    fn put_reports(&mut self, reports: Vec<DailyReport>) -> Result<(), ComputeError>;

    fn report(&self, date: NaiveDate) -> Option<DailyReport>;

    /// Reports with `from <= date <= to`, oldest first
    fn reports_in(&self, from: NaiveDate, to: NaiveDate) -> Vec<DailyReport>;

    /// Replace the current pattern report with a newer run
    fn put_patterns(&mut self, report: PatternReport) -> Result<(), ComputeError>;

    fn latest_patterns(&self) -> Option<PatternReport>;
}

/// BTreeMap-backed store
#[derive(Debug, Default)]
pub struct InMemoryStore {
    reports: BTreeMap<NaiveDate, DailyReport>,
    patterns: Option<PatternReport>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }
}

impl ReportStore for InMemoryStore {
    fn put_report(&mut self, report: DailyReport) -> Result<(), ComputeError> {
        self.reports.insert(report.date, report);
        Ok(())
    }

    fn put_reports(&mut self, reports: Vec<DailyReport>) -> Result<(), ComputeError> {
        self.reports
            .extend(reports.into_iter().map(|report| (report.date, report)));
        Ok(())
    }

    fn report(&self, date: NaiveDate) -> Option<DailyReport> {
        self.reports.get(&date).cloned()
    }

    fn reports_in(&self, from: NaiveDate, to: NaiveDate) -> Vec<DailyReport> {
        if from > to {
            return Vec::new();
        }
        self.reports.range(from..=to).map(|(_, r)| r.clone()).collect()
    }

    fn put_patterns(&mut self, report: PatternReport) -> Result<(), ComputeError> {
        self.patterns = Some(report);
        Ok(())
    }

    fn latest_patterns(&self) -> Option<PatternReport> {
        self.patterns.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strain::StrainScoreEngine;
    use crate::types::ConsistencyMetrics;
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    fn report(date: NaiveDate) -> DailyReport {
        DailyReport {
            date,
            hrv_deviation: None,
            rhr_deviation: None,
            recovery: None,
            strain: StrainScoreEngine::default()
                .calculate(&BTreeMap::new(), 100.0)
                .unwrap(),
            sleep: None,
            consistency: ConsistencyMetrics {
                bedtime_variance_sec: 0.0,
                wake_time_variance_sec: 0.0,
                consistency_score: 1.0,
                nights: 0,
                insufficient_data: true,
            },
        }
    }

    #[test]
    fn test_range_query() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut store = InMemoryStore::new();
        for i in 0..5 {
            store.put_report(report(start + Duration::days(i))).unwrap();
        }

        let range = store.reports_in(start + Duration::days(1), start + Duration::days(3));
        assert_eq!(range.len(), 3);
        assert_eq!(range[0].date, start + Duration::days(1));
        assert!(store.reports_in(start + Duration::days(3), start).is_empty());
    }

    #[test]
    fn test_put_reports_replaces_by_date() {
        let start = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        let mut store = InMemoryStore::new();
        store.put_report(report(start)).unwrap();

        let mut replacement = report(start);
        replacement.consistency.nights = 4;
        store
            .put_reports(vec![replacement, report(start + Duration::days(1))])
            .unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.report(start).unwrap().consistency.nights, 4);
    }

    #[test]
    fn test_pattern_report_superseded() {
        let mut store = InMemoryStore::new();
        let first = PatternReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            patterns: vec![],
        };
        let second = PatternReport {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            patterns: vec![],
        };
        store.put_patterns(first).unwrap();
        store.put_patterns(second.clone()).unwrap();

        assert_eq!(store.latest_patterns().unwrap().run_id, second.run_id);
    }
}
