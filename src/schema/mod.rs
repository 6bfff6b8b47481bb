//! Daily input schema
//!
//! Input arrives as JSON records, one per line (NDJSON) or as a JSON array.
//! Each record is either a daily sample or a goal observation.

mod input_record;
mod reader;

pub use input_record::*;
pub use reader::*;
