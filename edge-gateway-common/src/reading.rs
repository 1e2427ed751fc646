//! Sensor readings and their inference descriptors.

use serde::{Deserialize, Serialize};

use crate::layer::{InferenceLayer, UnknownLayer};

/// A batch of resource values reported by one sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    pub device_name: String,
    /// Correlation id, assigned by the gateway when the sensor omits it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading_uuid: Option<String>,
    /// Milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    pub readings: Vec<ResourceReading>,
    pub inference_descriptor: InferenceDescriptor,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceReading {
    pub resource_name: String,
    pub value: f64,
}

/// Where inference for a reading runs and what it produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InferenceDescriptor {
    /// Raw layer code. Validated by [`InferenceDescriptor::inference_layer`].
    #[serde(alias = "inference_layer")]
    pub layer: i64,
    /// Milliseconds since the Unix epoch, stamped by the sensor.
    pub send_timestamp: i64,
    #[serde(default)]
    pub prediction: Option<f64>,
}

impl InferenceDescriptor {
    pub fn new(layer: InferenceLayer, send_timestamp: i64) -> Self {
        Self {
            layer: layer.code(),
            send_timestamp,
            prediction: None,
        }
    }

    pub fn inference_layer(&self) -> Result<InferenceLayer, UnknownLayer> {
        InferenceLayer::from_code(self.layer)
    }
}

impl SensorReading {
    /// Ensure the reading carries a correlation id and return it.
    pub fn ensure_uuid(&mut self) -> &str {
        self.reading_uuid
            .get_or_insert_with(|| uuid::Uuid::new_v4().to_string())
            .as_str()
    }
}

/// Round-trip timing for a gateway-side prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyBenchmark {
    pub sensor_name: String,
    pub reading_uuid: String,
    pub send_timestamp: i64,
    pub recv_timestamp: i64,
    pub latency_ms: i64,
}
