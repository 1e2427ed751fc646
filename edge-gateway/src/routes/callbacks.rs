//! Callbacks used by the microservices around the gateway.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};

use edge_gateway_common::{CommandMethod, LatencyBenchmark, SensorProperty, SensorReading};

use crate::error::{GatewayError, Result};
use crate::inference::RoutedReading;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/export/reading", post(export_reading))
        .route("/export/sensor-reading", post(export_sensor_reading))
        .route(
            "/export/inference-latency-benchmark",
            post(export_latency_benchmark),
        )
        .route("/store/sensor/response/get/:property", post(store_sensor_response))
}

/// POST /export/reading - Route a reading to its inference layer.
async fn export_reading(
    State(state): State<Arc<AppState>>,
    Json(reading): Json<SensorReading>,
) -> Result<Json<RoutedReading>> {
    let cancel = state.shutdown.child_token();
    Ok(Json(state.router.route(reading, &cancel).await?))
}

/// POST /export/sensor-reading - Forward a raw reading to the cloud.
async fn export_sensor_reading(
    State(state): State<Arc<AppState>>,
    Json(reading): Json<serde_json::Value>,
) -> Result<StatusCode> {
    state.services.cloud.export_sensor_reading(&reading).await?;
    Ok(StatusCode::CREATED)
}

/// POST /export/inference-latency-benchmark - Forward a sensor-side benchmark.
///
/// Dropped when benchmarking is disabled.
async fn export_latency_benchmark(
    State(state): State<Arc<AppState>>,
    Json(benchmark): Json<LatencyBenchmark>,
) -> Result<StatusCode> {
    if !state.router.policy().latency_benchmark {
        tracing::debug!(sensor = %benchmark.sensor_name, "Latency benchmarking disabled, dropping");
        return Ok(StatusCode::ACCEPTED);
    }

    state
        .services
        .cloud
        .export_latency_benchmark(&benchmark)
        .await?;
    Ok(StatusCode::CREATED)
}

/// POST /store/sensor/response/get/:property - Store the answer to a `get` command.
async fn store_sensor_response(
    State(state): State<Arc<AppState>>,
    Path(property): Path<String>,
    Json(response): Json<serde_json::Value>,
) -> Result<StatusCode> {
    let property: SensorProperty = property.parse().map_err(GatewayError::Validation)?;
    if !property.supports(CommandMethod::Get) {
        return Err(GatewayError::Validation(format!(
            "'{}' has no get responses",
            property
        )));
    }

    state
        .services
        .cloud
        .store_sensor_response(property, &response)
        .await?;
    Ok(StatusCode::ACCEPTED)
}
