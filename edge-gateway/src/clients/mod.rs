//! HTTP clients for the services around the gateway.
//!
//! Each client sits behind a trait so the routing and command paths can be
//! exercised with in-process fakes.

pub mod cloud;
pub mod device;
pub mod inference;
pub mod metadata;
pub mod sensor;

pub use cloud::{CloudClient, CloudSink};
pub use device::EdgexCommandChannel;
pub use inference::{InferenceClient, InferenceService};
pub use metadata::{DeviceRegistry, MetadataClient};
pub use sensor::{SensorControl, SensorControlClient};

use reqwest::{Client, Response, StatusCode};

use crate::config::ServicesConfig;
use crate::error::{GatewayError, Result};

/// Shared HTTP client for every upstream service.
pub fn http_client(config: &ServicesConfig) -> Result<Client> {
    Client::builder()
        .timeout(config.request_timeout())
        .build()
        .map_err(|e| GatewayError::upstream("http client", e))
}

fn base_url(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

/// Pass the response through when it carries `expected`, otherwise turn it
/// into `UpstreamRejected` with the body as detail.
async fn expect_status(
    service: &'static str,
    response: Response,
    expected: StatusCode,
) -> Result<Response> {
    let status = response.status();
    if status == expected {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(GatewayError::UpstreamRejected {
        service,
        status: status.as_u16(),
        body,
    })
}
