//! Recovery Flux - daily recovery, strain and sleep scoring for wearable data
//!
//! Flux turns one sample per day into personal-baseline scores through a
//! deterministic pipeline: baseline computation → deviation → consistency
//! → sleep performance → recovery and strain composites. Pattern detection
//! and weekly rollups run on demand over the scored history.
//!
//! ## Modules
//!
//! - **Scoring**: baselines, deviations and the three composite scores
//! - **Insights**: correlation patterns across metrics and tracked goals
//! - **Rollups**: calendar-week summaries

pub mod baseline;
pub mod config;
pub mod consistency;
pub mod deviation;
pub mod encoder;
pub mod error;
pub mod patterns;
pub mod pipeline;
pub mod recovery;
pub mod schema;
pub mod sleep;
pub mod store;
pub mod strain;
pub mod types;
pub mod weekly;

pub use config::FluxConfig;
pub use error::ComputeError;
pub use pipeline::{score_day, DailyScorer, FluxProcessor};
pub use store::{InMemoryStore, ReportStore};

// Schema exports
pub use schema::{InputReader, InputRecord, SCHEMA_VERSION};

/// Flux version embedded in all output envelopes
pub const FLUX_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for output envelopes
pub const PRODUCER_NAME: &str = "recovery-flux";
