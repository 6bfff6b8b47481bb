//! Output encoding
//!
//! Wraps computed outputs in an envelope carrying producer metadata so that a
//! downstream store or presentation layer can tell which engine build and
//! which processor instance produced them.

use crate::error::ComputeError;
use crate::{FLUX_VERSION, PRODUCER_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current output envelope version
pub const OUTPUT_VERSION: &str = "1.0.0";

/// Producer metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Envelope around one output value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutputEnvelope<T> {
    pub output_version: String,
    pub producer: Producer,
    pub computed_at_utc: DateTime<Utc>,
    pub payload: T,
}

/// Encoder for producing output envelopes
pub struct OutputEncoder {
    instance_id: String,
}

impl Default for OutputEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap a payload in an envelope stamped with the current time
    pub fn wrap<T: Serialize>(&self, payload: T) -> OutputEnvelope<T> {
        OutputEnvelope {
            output_version: OUTPUT_VERSION.to_string(),
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: FLUX_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at_utc: Utc::now(),
            payload,
        }
    }

    /// Encode to a single-line JSON string
    pub fn encode_to_json<T: Serialize>(&self, payload: &T) -> Result<String, ComputeError> {
        Ok(serde_json::to_string(&self.wrap(payload))?)
    }

    /// Encode to pretty-printed JSON
    pub fn encode_to_json_pretty<T: Serialize>(&self, payload: &T) -> Result<String, ComputeError> {
        Ok(serde_json::to_string_pretty(&self.wrap(payload))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_fields() {
        let encoder = OutputEncoder::with_instance_id("instance-1".to_string());
        let encoded = encoder.encode_to_json(&json!({"score": 82})).unwrap();
        let value: serde_json::Value = serde_json::from_str(&encoded).unwrap();

        assert_eq!(value["output_version"], OUTPUT_VERSION);
        assert_eq!(value["producer"]["name"], PRODUCER_NAME);
        assert_eq!(value["producer"]["version"], FLUX_VERSION);
        assert_eq!(value["producer"]["instance_id"], "instance-1");
        assert_eq!(value["payload"]["score"], 82);
        assert!(value["computed_at_utc"].as_str().is_some());
    }

    #[test]
    fn test_unique_instance_ids() {
        let a = OutputEncoder::new();
        let b = OutputEncoder::new();
        assert_ne!(a.instance_id(), b.instance_id());
    }
}
