use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Serialize;

use edge_gateway_common::{LatencyBenchmark, SensorProperty, SensorReading};

use super::expect_status;
use crate::error::{GatewayError, Result};

const SERVICE: &str = "cloud";

/// Remote cloud backend receiving exports from the gateway.
#[async_trait]
pub trait CloudSink: Send + Sync {
    /// Raw sensor reading pass-through.
    async fn export_sensor_reading(&self, reading: &serde_json::Value) -> Result<()>;

    /// Reading whose inference runs in the cloud.
    async fn export_prediction_request(&self, reading: &SensorReading) -> Result<()>;

    /// Reading carrying a completed prediction.
    async fn export_prediction_result(&self, reading: &SensorReading) -> Result<()>;

    async fn export_latency_benchmark(&self, benchmark: &LatencyBenchmark) -> Result<()>;

    /// Answer to an earlier `get` sensor command.
    async fn store_sensor_response(
        &self,
        property: SensorProperty,
        response: &serde_json::Value,
    ) -> Result<()>;
}

pub struct CloudClient {
    http_client: Client,
    base_url: String,
}

impl CloudClient {
    pub fn new(http_client: Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: super::base_url(base_url),
        }
    }

    async fn post<T: Serialize + Sync + ?Sized>(
        &self,
        path: &str,
        body: &T,
        expected: StatusCode,
    ) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!("Exporting to {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(SERVICE, e))?;
        expect_status(SERVICE, response, expected).await?;
        Ok(())
    }
}

#[async_trait]
impl CloudSink for CloudClient {
    async fn export_sensor_reading(&self, reading: &serde_json::Value) -> Result<()> {
        self.post("/export/sensor-reading", reading, StatusCode::CREATED)
            .await
    }

    async fn export_prediction_request(&self, reading: &SensorReading) -> Result<()> {
        self.post("/export/prediction-request", reading, StatusCode::ACCEPTED)
            .await
    }

    async fn export_prediction_result(&self, reading: &SensorReading) -> Result<()> {
        self.post("/export/prediction-result", reading, StatusCode::CREATED)
            .await
    }

    async fn export_latency_benchmark(&self, benchmark: &LatencyBenchmark) -> Result<()> {
        self.post(
            "/export/inference-latency-benchmark",
            benchmark,
            StatusCode::CREATED,
        )
        .await
    }

    async fn store_sensor_response(
        &self,
        property: SensorProperty,
        response: &serde_json::Value,
    ) -> Result<()> {
        let path = format!("/store/sensor/response/get/{}", property.as_str());
        self.post(&path, response, StatusCode::CREATED).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_gateway_common::{InferenceDescriptor, InferenceLayer};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_prediction_result_export() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/export/prediction-result"))
            .and(body_partial_json(json!({
                "device_name": "sensor-a",
                "inference_descriptor": {"layer": 1, "prediction": 0.5}
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let mut descriptor = InferenceDescriptor::new(InferenceLayer::Gateway, 10);
        descriptor.prediction = Some(0.5);
        let reading = SensorReading {
            device_name: "sensor-a".to_string(),
            reading_uuid: None,
            timestamp: None,
            readings: Vec::new(),
            inference_descriptor: descriptor,
        };

        let client = CloudClient::new(Client::new(), &server.uri());
        client.export_prediction_result(&reading).await.unwrap();
    }

    #[tokio::test]
    async fn test_unexpected_status_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/export/sensor-reading"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = CloudClient::new(Client::new(), &server.uri());
        let err = client
            .export_sensor_reading(&json!({"device_name": "sensor-a"}))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamRejected { status: 200, .. }));
    }

    #[tokio::test]
    async fn test_store_sensor_response_path() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/store/sensor/response/get/sensor-config"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        let client = CloudClient::new(Client::new(), &server.uri());
        client
            .store_sensor_response(SensorProperty::SensorConfig, &json!({"interval": 500}))
            .await
            .unwrap();
    }
}
