//! Parsing of input files into samples and goal observations

use crate::error::ComputeError;
use crate::schema::input_record::{InputRecord, ValidationError};
use crate::types::{DailySample, GoalObservation};
use std::collections::BTreeSet;

/// Reader for daily input records
pub struct InputReader;

impl InputReader {
    /// Parse a JSON string containing an array of records
    pub fn parse_array(json: &str) -> Result<Vec<InputRecord>, ComputeError> {
        let records: Vec<InputRecord> = serde_json::from_str(json)?;
        Ok(records)
    }

    /// Parse NDJSON (newline-delimited JSON) records
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<InputRecord>, ComputeError> {
        let mut records = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<InputRecord>(trimmed) {
                Ok(record) => records.push(record),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(records)
    }

    /// Validate and split records into date-ordered samples and goals.
    ///
    /// A second sample for the same date, or a second observation of the
    /// same goal on one date, is rejected.
    pub fn split(
        records: Vec<InputRecord>,
    ) -> Result<(Vec<DailySample>, Vec<GoalObservation>), ComputeError> {
        let mut samples = Vec::new();
        let mut goals = Vec::new();
        let mut seen = BTreeSet::new();
        let mut seen_goals = BTreeSet::new();

        for record in records {
            record
                .validate()
                .map_err(|e| ComputeError::InvalidInput(e.to_string()))?;
            match record {
                InputRecord::Sample(sample) => {
                    if !seen.insert(sample.date) {
                        return Err(ComputeError::DuplicateSample(sample.date));
                    }
                    samples.push(sample);
                }
                InputRecord::Goal(goal) => {
                    if !seen_goals.insert((goal.goal_id.clone(), goal.date)) {
                        return Err(ComputeError::DuplicateGoalObservation {
                            goal_id: goal.goal_id,
                            date: goal.date,
                        });
                    }
                    goals.push(goal);
                }
            }
        }

        samples.sort_by_key(|s| s.date);
        goals.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.goal_id.cmp(&b.goal_id)));
        Ok((samples, goals))
    }

    /// Validate every record, reporting all failures rather than the first
    pub fn validate_records(records: &[InputRecord]) -> Vec<ValidationResult> {
        records
            .iter()
            .enumerate()
            .map(|(index, record)| ValidationResult {
                index,
                error: record.validate().err(),
            })
            .collect()
    }
}

/// Outcome of validating one record
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub index: usize,
    pub error: Option<ValidationError>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.error.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NDJSON: &str = r#"
{"record_type": "sample", "date": "2024-01-16", "hrv_ms": 62.0}
{"record_type": "goal", "date": "2024-01-15", "goal_id": "walk", "value": 1.0}

{"record_type": "sample", "date": "2024-01-15", "hrv_ms": 58.0}
"#;

    #[test]
    fn test_parse_ndjson_and_split() {
        let records = InputReader::parse_ndjson(NDJSON).unwrap();
        assert_eq!(records.len(), 3);

        let (samples, goals) = InputReader::split(records).unwrap();
        assert_eq!(samples.len(), 2);
        assert!(samples[0].date < samples[1].date);
        assert_eq!(goals.len(), 1);
    }

    #[test]
    fn test_parse_error_reports_line() {
        let err = InputReader::parse_ndjson("{\"record_type\": \"sample\", \"date\": \"2024-01-15\"}\nnot json")
            .unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_duplicate_date_rejected() {
        let json = r#"[
            {"record_type": "sample", "date": "2024-01-15"},
            {"record_type": "sample", "date": "2024-01-15", "hrv_ms": 70.0}
        ]"#;
        let records = InputReader::parse_array(json).unwrap();
        assert!(matches!(
            InputReader::split(records),
            Err(ComputeError::DuplicateSample(_))
        ));
    }

    #[test]
    fn test_duplicate_goal_observation_rejected() {
        let ndjson = r#"
{"record_type": "goal", "date": "2024-01-15", "goal_id": "walk", "value": 1.0}
{"record_type": "goal", "date": "2024-01-15", "goal_id": "read", "value": 1.0}
{"record_type": "goal", "date": "2024-01-15", "goal_id": "walk", "value": 0.0}
"#;
        let records = InputReader::parse_ndjson(ndjson).unwrap();
        assert!(matches!(
            InputReader::split(records),
            Err(ComputeError::DuplicateGoalObservation { ref goal_id, .. }) if goal_id == "walk"
        ));
    }

    #[test]
    fn test_validate_records_collects_all() {
        let json = r#"[
            {"record_type": "sample", "date": "2024-01-15", "sleep_efficiency": 2.0},
            {"record_type": "sample", "date": "2024-01-16"},
            {"record_type": "goal", "date": "2024-01-16", "goal_id": "", "value": 1.0}
        ]"#;
        let records = InputReader::parse_array(json).unwrap();
        let results = InputReader::validate_records(&records);
        let invalid: Vec<usize> = results.iter().filter(|r| !r.is_valid()).map(|r| r.index).collect();
        assert_eq!(invalid, vec![0, 2]);
    }
}
