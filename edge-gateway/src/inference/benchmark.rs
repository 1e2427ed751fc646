use std::sync::Arc;

use chrono::Utc;

use edge_gateway_common::{LatencyBenchmark, SensorReading};

use crate::clients::CloudSink;

/// Best-effort latency telemetry for gateway-side predictions.
///
/// Failures are logged and never reach the caller.
pub struct LatencyBenchmarker {
    cloud: Arc<dyn CloudSink>,
}

impl LatencyBenchmarker {
    pub fn new(cloud: Arc<dyn CloudSink>) -> Self {
        Self { cloud }
    }

    /// Elapsed time from the sensor's send timestamp to `recv_timestamp`.
    /// Negative values (clock skew) are clamped to zero.
    pub fn measure(reading: &SensorReading, recv_timestamp: i64) -> LatencyBenchmark {
        let send_timestamp = reading.inference_descriptor.send_timestamp;
        let elapsed = recv_timestamp - send_timestamp;
        if elapsed < 0 {
            tracing::warn!(
                sensor = %reading.device_name,
                elapsed_ms = elapsed,
                "Negative inference latency, sensor clock ahead of gateway"
            );
        }

        LatencyBenchmark {
            sensor_name: reading.device_name.clone(),
            reading_uuid: reading.reading_uuid.clone().unwrap_or_default(),
            send_timestamp,
            recv_timestamp,
            latency_ms: elapsed.max(0),
        }
    }

    pub async fn record(&self, reading: &SensorReading) -> LatencyBenchmark {
        let benchmark = Self::measure(reading, Utc::now().timestamp_millis());

        tracing::info!(
            sensor = %benchmark.sensor_name,
            reading_uuid = %benchmark.reading_uuid,
            latency_ms = benchmark.latency_ms,
            "Inference latency"
        );

        if let Err(e) = self.cloud.export_latency_benchmark(&benchmark).await {
            tracing::warn!(sensor = %benchmark.sensor_name, error = %e, "Latency benchmark export failed");
        }

        benchmark
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::RecordingCloudSink;
    use edge_gateway_common::{InferenceDescriptor, InferenceLayer};

    fn reading(send_timestamp: i64) -> SensorReading {
        SensorReading {
            device_name: "sensor-a".to_string(),
            reading_uuid: Some("r-1".to_string()),
            timestamp: None,
            readings: Vec::new(),
            inference_descriptor: InferenceDescriptor::new(InferenceLayer::Gateway, send_timestamp),
        }
    }

    #[test]
    fn test_measure() {
        let benchmark = LatencyBenchmarker::measure(&reading(1_000), 1_250);
        assert_eq!(benchmark.latency_ms, 250);
        assert_eq!(benchmark.reading_uuid, "r-1");
    }

    #[test]
    fn test_clock_skew_clamped() {
        let benchmark = LatencyBenchmarker::measure(&reading(2_000), 1_500);
        assert_eq!(benchmark.latency_ms, 0);
        assert_eq!(benchmark.recv_timestamp, 1_500);
    }

    #[tokio::test]
    async fn test_record_exports() {
        let cloud = Arc::new(RecordingCloudSink::new());
        let benchmarker = LatencyBenchmarker::new(cloud.clone());

        let now = Utc::now().timestamp_millis();
        benchmarker.record(&reading(now - 100)).await;

        let exported = cloud.exports("inference-latency-benchmark");
        assert_eq!(exported.len(), 1);
        assert!(exported[0]["latency_ms"].as_i64().unwrap() >= 100);
    }

    #[tokio::test]
    async fn test_export_failure_is_swallowed() {
        let cloud = Arc::new(RecordingCloudSink::failing_benchmarks());
        let benchmarker = LatencyBenchmarker::new(cloud.clone());

        let benchmark = benchmarker.record(&reading(0)).await;
        assert_eq!(benchmark.sensor_name, "sensor-a");
        assert_eq!(cloud.total(), 0);
    }
}
