//! Input record definitions and validation

use crate::types::{DailySample, GoalObservation};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Current input schema version
pub const SCHEMA_VERSION: &str = "flux.daily_input.v1";

/// Longest plausible sleep in a single day (hours)
const MAX_SLEEP_HOURS: f64 = 24.0;

/// One line of input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record_type", rename_all = "snake_case")]
pub enum InputRecord {
    Sample(DailySample),
    Goal(GoalObservation),
}

impl InputRecord {
    pub fn date(&self) -> NaiveDate {
        match self {
            InputRecord::Sample(s) => s.date,
            InputRecord::Goal(g) => g.date,
        }
    }

    /// Check physical plausibility of the record's fields
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            InputRecord::Sample(sample) => validate_sample(sample),
            InputRecord::Goal(goal) => {
                if goal.goal_id.trim().is_empty() {
                    return Err(ValidationError::EmptyGoalId { date: goal.date });
                }
                require_finite(goal.date, "value", goal.value)
            }
        }
    }
}

/// Reject values that cannot come from a real measurement
pub fn validate_sample(sample: &DailySample) -> Result<(), ValidationError> {
    let date = sample.date;

    if let Some(hrv) = sample.hrv_ms {
        require_positive(date, "hrv_ms", hrv)?;
    }
    if let Some(rhr) = sample.resting_hr_bpm {
        require_positive(date, "resting_hr_bpm", rhr)?;
    }
    if let Some(hours) = sample.sleep_hours {
        require_finite(date, "sleep_hours", hours)?;
        if !(0.0..=MAX_SLEEP_HOURS).contains(&hours) {
            return Err(ValidationError::OutOfRange {
                date,
                field: "sleep_hours",
                value: hours,
            });
        }
    }
    if let Some(efficiency) = sample.sleep_efficiency {
        if !(0.0..=1.0).contains(&efficiency) {
            return Err(ValidationError::OutOfRange {
                date,
                field: "sleep_efficiency",
                value: efficiency,
            });
        }
    }
    for minutes in sample.zone_minutes.values() {
        require_non_negative(date, "zone_minutes", *minutes)?;
    }
    require_non_negative(date, "active_energy_kcal", sample.active_energy_kcal)
}

fn require_finite(date: NaiveDate, field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { date, field, value })
    }
}

fn require_positive(date: NaiveDate, field: &'static str, value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { date, field, value })
    }
}

fn require_non_negative(
    date: NaiveDate,
    field: &'static str,
    value: f64,
) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::OutOfRange { date, field, value })
    }
}

/// Validation errors for input records
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} out of range on {date}: {value}")]
    OutOfRange {
        date: NaiveDate,
        field: &'static str,
        value: f64,
    },

    #[error("Goal observation on {date} has an empty goal_id")]
    EmptyGoalId { date: NaiveDate },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::HrZone;
    use chrono::NaiveTime;

    #[test]
    fn test_deserialize_sample_record() {
        let json = r#"{
            "record_type": "sample",
            "date": "2024-01-15",
            "hrv_ms": 65.0,
            "resting_hr_bpm": 52.0,
            "sleep_hours": 7.5,
            "sleep_efficiency": 0.92,
            "bedtime": "22:45:00",
            "wake_time": "06:30:00",
            "zone_minutes": {"zone2": 30.0, "zone4": 12.5},
            "active_energy_kcal": 540.0
        }"#;

        let record: InputRecord = serde_json::from_str(json).unwrap();
        let InputRecord::Sample(sample) = record else {
            panic!("expected a sample record");
        };
        assert_eq!(sample.hrv_ms, Some(65.0));
        assert_eq!(sample.bedtime, NaiveTime::from_hms_opt(22, 45, 0));
        assert_eq!(sample.zone_minutes.get(&HrZone::Zone4), Some(&12.5));
        assert!(sample.zone_minutes.get(&HrZone::Zone1).is_none());
    }

    #[test]
    fn test_missing_fields_stay_absent() {
        let json = r#"{"record_type": "sample", "date": "2024-01-15"}"#;
        let record: InputRecord = serde_json::from_str(json).unwrap();
        let InputRecord::Sample(sample) = record else {
            panic!("expected a sample record");
        };
        assert!(sample.hrv_ms.is_none());
        assert!(sample.sleep_hours.is_none());
        assert_eq!(sample.active_energy_kcal, 0.0);
        assert!(record_validates(&sample));
    }

    #[test]
    fn test_deserialize_goal_record() {
        let json = r#"{"record_type": "goal", "date": "2024-01-15", "goal_id": "no_screens", "value": 1.0}"#;
        let record: InputRecord = serde_json::from_str(json).unwrap();
        assert!(matches!(record, InputRecord::Goal(ref g) if g.goal_id == "no_screens"));
        assert!(record.validate().is_ok());
    }

    #[test]
    fn test_validation() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut sample = DailySample::new(date);
        sample.sleep_efficiency = Some(1.4);
        assert!(matches!(
            validate_sample(&sample),
            Err(ValidationError::OutOfRange { field: "sleep_efficiency", .. })
        ));

        let mut sample = DailySample::new(date);
        sample.hrv_ms = Some(0.0);
        assert!(validate_sample(&sample).is_err());

        let goal = InputRecord::Goal(GoalObservation {
            date,
            goal_id: " ".to_string(),
            value: 1.0,
        });
        assert_eq!(goal.validate(), Err(ValidationError::EmptyGoalId { date }));
    }

    fn record_validates(sample: &DailySample) -> bool {
        validate_sample(sample).is_ok()
    }
}
