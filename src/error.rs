//! Error types for Recovery Flux
//!
//! Only contract violations the caller controls are errors. Missing data and
//! guarded arithmetic resolve to neutral values inside the engines.

use chrono::{NaiveDate, Weekday};
use thiserror::Error;

/// Errors that can occur during computation
///
/// `InvalidConfig` is the invalid-input case for weight and threshold tables;
/// it is raised when an engine or processor is constructed.
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Duplicate daily sample for {0}")]
    DuplicateSample(NaiveDate),

    #[error("Duplicate observation of goal '{goal_id}' on {date}")]
    DuplicateGoalObservation { goal_id: String, date: NaiveDate },

    #[error("Week start {date} is a {actual:?}, expected {expected:?}")]
    UnalignedWeekStart {
        date: NaiveDate,
        expected: Weekday,
        actual: Weekday,
    },

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse input: {0}")]
    ParseError(String),

    #[error("Store error: {0}")]
    StoreError(String),
}
