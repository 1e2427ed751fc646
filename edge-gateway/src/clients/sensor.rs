use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use edge_gateway_common::{SensorAck, SensorCommand};

use crate::error::{GatewayError, Result};

const SERVICE: &str = "sensor-control service";

/// Sensor-control service (the MQTT bridge to field sensors).
#[async_trait]
pub trait SensorControl: Send + Sync {
    /// Send a command and wait for its acknowledgement. Anything other than
    /// HTTP 202 is a delivery failure.
    async fn send(&self, command: &SensorCommand) -> Result<SensorAck>;
}

pub struct SensorControlClient {
    http_client: Client,
    base_url: String,
}

impl SensorControlClient {
    pub fn new(http_client: Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: super::base_url(base_url),
        }
    }
}

fn target_label(command: &SensorCommand) -> String {
    format!(
        "{}/{}",
        command.target.gateway_name,
        command.target.target_sensors.join(",")
    )
}

#[async_trait]
impl SensorControl for SensorControlClient {
    async fn send(&self, command: &SensorCommand) -> Result<SensorAck> {
        let url = format!("{}{}", self.base_url, command.path());
        tracing::debug!(property = %command.property_name, "Sending sensor command to {}", url);

        let response = self
            .http_client
            .post(&url)
            .json(command)
            .send()
            .await
            .map_err(|e| GatewayError::CommandDeliveryFailed {
                target: target_label(command),
                status: None,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status != StatusCode::ACCEPTED {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::CommandDeliveryFailed {
                target: target_label(command),
                status: Some(status.as_u16()),
                reason: format!("expected 202, got {}: {}", status, body),
            });
        }

        // Set commands may be acknowledged with an empty body.
        let body = response.bytes().await.map_err(|e| GatewayError::CommandDeliveryFailed {
            target: target_label(command),
            status: Some(status.as_u16()),
            reason: e.to_string(),
        })?;
        if body.is_empty() {
            return Ok(SensorAck::default());
        }
        serde_json::from_slice(&body).map_err(|e| {
            tracing::warn!(property = %command.property_name, error = %e, "Malformed sensor acknowledgement");
            GatewayError::UpstreamRejected {
                service: SERVICE,
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use edge_gateway_common::{GatewayTarget, InferenceLayer, SensorProperty};
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_set_inference_layer() {
        let server = MockServer::start().await;
        let command = SensorCommand::set_inference_layer(
            GatewayTarget::single("gw-1", "sensor-a"),
            InferenceLayer::Cloud,
        );

        Mock::given(method("POST"))
            .and(path("/sensor/command/set/inference-layer"))
            .and(body_json(json!({
                "target": {"gateway_name": "gw-1", "target_sensors": ["sensor-a"]},
                "method": "set",
                "property_name": "inference-layer",
                "property_value": 2
            })))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let client = SensorControlClient::new(Client::new(), &server.uri());
        let ack = client.send(&command).await.unwrap();
        assert_eq!(ack, SensorAck::default());
    }

    #[tokio::test]
    async fn test_get_returns_command_uuids() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sensor/command/get/sensor-config"))
            .respond_with(
                ResponseTemplate::new(202).set_body_json(json!({"command_uuids": ["c-1", "c-2"]})),
            )
            .mount(&server)
            .await;

        let client = SensorControlClient::new(Client::new(), &server.uri());
        let command = SensorCommand::get(
            GatewayTarget::single("gw-1", "sensor-a"),
            SensorProperty::SensorConfig,
        );
        let ack = client.send(&command).await.unwrap();
        assert_eq!(
            ack.command_uuids,
            Some(vec!["c-1".to_string(), "c-2".to_string()])
        );
    }

    #[tokio::test]
    async fn test_malformed_ack_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sensor/command/get/sensor-config"))
            .respond_with(ResponseTemplate::new(202).set_body_string("queued"))
            .mount(&server)
            .await;

        let client = SensorControlClient::new(Client::new(), &server.uri());
        let command = SensorCommand::get(
            GatewayTarget::single("gw-1", "sensor-a"),
            SensorProperty::SensorConfig,
        );
        let err = client.send(&command).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::UpstreamRejected { status: 202, ref body, .. } if body == "queued"
        ));
        assert_eq!(err.status_code(), reqwest::StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_non_accepted_status_is_delivery_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sensor/command/set/sensor-state"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = SensorControlClient::new(Client::new(), &server.uri());
        let command = SensorCommand::set_sensor_state(
            GatewayTarget::single("gw-1", "sensor-a"),
            edge_gateway_common::SensorState::Error,
        );
        let err = client.send(&command).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::CommandDeliveryFailed { status: Some(200), ref target, .. } if target == "gw-1/sensor-a"
        ));
    }
}
