use std::collections::HashSet;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::expect_status;
use crate::error::{GatewayError, Result};

const SERVICE: &str = "metadata service";

/// Registry of the sensors known to this gateway.
#[async_trait]
pub trait DeviceRegistry: Send + Sync {
    /// Succeeds only when every name is registered. The first unknown name
    /// fails the whole batch.
    async fn verify_registered(&self, names: &[String]) -> Result<()>;
}

#[derive(Debug, Deserialize)]
struct SensorDescriptor {
    device_name: String,
}

pub struct MetadataClient {
    http_client: Client,
    base_url: String,
}

impl MetadataClient {
    pub fn new(http_client: Client, base_url: &str) -> Self {
        Self {
            http_client,
            base_url: super::base_url(base_url),
        }
    }

    async fn registered_sensors(&self) -> Result<HashSet<String>> {
        let url = format!("{}/sensors", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .send()
            .await
            .map_err(|e| GatewayError::upstream(SERVICE, e))?;
        let response = expect_status(SERVICE, response, StatusCode::OK).await?;

        let sensors: Vec<SensorDescriptor> = response
            .json()
            .await
            .map_err(|e| GatewayError::upstream(SERVICE, e))?;

        Ok(sensors.into_iter().map(|s| s.device_name).collect())
    }
}

#[async_trait]
impl DeviceRegistry for MetadataClient {
    async fn verify_registered(&self, names: &[String]) -> Result<()> {
        let registered = self.registered_sensors().await?;

        match names.iter().find(|name| !registered.contains(name.as_str())) {
            Some(unknown) => Err(GatewayError::DeviceNotRegistered(unknown.clone())),
            None => Ok(()),
        }
    }
}
