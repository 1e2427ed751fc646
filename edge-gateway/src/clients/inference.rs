use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use edge_gateway_common::{GatewayModel, PredictionTask, SensorReading, TaskHandle};

use super::expect_status;
use crate::error::{GatewayError, Result};

const SERVICE: &str = "inference service";

/// Local inference service.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Queue a reading for prediction.
    async fn submit(&self, reading: &SensorReading) -> Result<TaskHandle>;

    /// Current state of a prediction task.
    async fn task_status(&self, task_id: &str) -> Result<PredictionTask>;

    /// Replace the model used for gateway-side predictions.
    async fn upload_model(&self, model: &GatewayModel) -> Result<()>;
}

pub struct InferenceClient {
    http_client: Client,
    base_url: String,
}

impl InferenceClient {
    pub fn new(http_client: Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: super::base_url(base_url),
        }
    }
}

#[async_trait]
impl InferenceService for InferenceClient {
    async fn submit(&self, reading: &SensorReading) -> Result<TaskHandle> {
        let url = format!("{}/model/prediction/request", self.base_url);
        tracing::debug!("Submitting prediction request to {}", url);

        let response = self
            .http_client
            .put(&url)
            .json(reading)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(SERVICE, e))?;
        let response = expect_status(SERVICE, response, StatusCode::ACCEPTED).await?;

        response
            .json()
            .await
            .map_err(|e| GatewayError::upstream(SERVICE, e))
    }

    async fn task_status(&self, task_id: &str) -> Result<PredictionTask> {
        let url = format!("{}/model/prediction/task/{}", self.base_url, task_id);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(SERVICE, e))?;
        let response = expect_status(SERVICE, response, StatusCode::OK).await?;

        response
            .json()
            .await
            .map_err(|e| GatewayError::upstream(SERVICE, e))
    }

    async fn upload_model(&self, model: &GatewayModel) -> Result<()> {
        let url = format!("{}/model/upload", self.base_url);
        tracing::info!(model_size = model.model_size, "Uploading gateway model");

        let response = self
            .http_client
            .post(&url)
            .json(model)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(SERVICE, e))?;
        expect_status(SERVICE, response, StatusCode::ACCEPTED).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_gateway_common::{InferenceDescriptor, InferenceLayer, TaskStatus};
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reading() -> SensorReading {
        SensorReading {
            device_name: "sensor-a".to_string(),
            reading_uuid: Some("r-1".to_string()),
            timestamp: None,
            readings: Vec::new(),
            inference_descriptor: InferenceDescriptor::new(InferenceLayer::Gateway, 1_000),
        }
    }

    #[tokio::test]
    async fn test_submit_returns_task_handle() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/model/prediction/request"))
            .and(body_partial_json(json!({"device_name": "sensor-a"})))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({"task_id": "t-1"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = InferenceClient::new(Client::new(), &format!("{}/", server.uri()));
        let handle = client.submit(&reading()).await.unwrap();
        assert_eq!(handle.task_id, "t-1");
    }

    #[tokio::test]
    async fn test_submit_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/model/prediction/request"))
            .respond_with(ResponseTemplate::new(422).set_body_string("bad reading"))
            .mount(&server)
            .await;

        let client = InferenceClient::new(Client::new(), &server.uri());
        let err = client.submit(&reading()).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::UpstreamRejected { status: 422, ref body, .. } if body == "bad reading"
        ));
    }

    #[tokio::test]
    async fn test_task_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/model/prediction/task/t-9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "task_id": "t-9",
                "status": "PENDING"
            })))
            .mount(&server)
            .await;

        let client = InferenceClient::new(Client::new(), &server.uri());
        let task = client.task_status("t-9").await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
    }

    #[tokio::test]
    async fn test_unreachable_service() {
        let client = InferenceClient::new(Client::new(), "http://127.0.0.1:1");
        let err = client.task_status("t-1").await.unwrap_err();
        assert!(matches!(err, GatewayError::UpstreamUnavailable { .. }));
    }
}
