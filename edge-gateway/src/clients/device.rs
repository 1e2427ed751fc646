use async_trait::async_trait;
use reqwest::{Client, Url};

use edge_gateway_common::Command;

use crate::dispatch::DeviceChannel;
use crate::error::{GatewayError, Result};

/// Device channel over an EdgeX core-command style API.
///
/// Commands are issued as `PUT /device/name/{device}/{kind}` with the payload
/// as body. Any 2xx counts as executed.
pub struct EdgexCommandChannel {
    http_client: Client,
    base_url: String,
}

impl EdgexCommandChannel {
    pub fn new(http_client: Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: super::base_url(base_url),
        }
    }

    /// Device and kind are pushed as escaped path segments.
    fn command_url(&self, command: &Command) -> Result<Url> {
        let invalid = |reason: String| GatewayError::CommandDeliveryFailed {
            target: command.device_id.clone(),
            status: None,
            reason,
        };

        let mut url = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| invalid(format!("cannot build a command path on {}", self.base_url)))?
            .pop_if_empty()
            .extend(["device", "name", command.device_id.as_str(), command.kind.as_str()]);
        Ok(url)
    }
}

#[async_trait]
impl DeviceChannel for EdgexCommandChannel {
    async fn execute(&self, command: &Command) -> Result<()> {
        let url = self.command_url(command)?;

        let response = self
            .http_client
            .put(url)
            .json(&command.payload)
            .send()
            .await
            .map_err(|e| GatewayError::CommandDeliveryFailed {
                target: command.device_id.clone(),
                status: None,
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::CommandDeliveryFailed {
                target: command.device_id.clone(),
                status: Some(status.as_u16()),
                reason: format!("{} rejected: {}", command.kind, body),
            });
        }

        Ok(())
    }
}
