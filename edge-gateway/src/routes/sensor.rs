//! Operator commands forwarded to sensors and to the gateway itself.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;

use edge_gateway_common::{
    CommandMethod, GatewayModel, GatewayTarget, SensorAck, SensorCommand, SensorProperty,
};

use crate::error::{GatewayError, Result};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sensor/command/:method/:property", post(sensor_command))
        .route("/gateway/command/set/gateway-model", post(set_gateway_model))
}

#[derive(Debug, Deserialize)]
struct SensorCommandRequest {
    target: GatewayTarget,
    #[serde(default)]
    property_value: serde_json::Value,
}

fn parse_command(method: &str, property: &str) -> Result<(CommandMethod, SensorProperty)> {
    let method: CommandMethod = method.parse().map_err(GatewayError::Validation)?;
    let property: SensorProperty = property.parse().map_err(GatewayError::Validation)?;

    if !property.supports(method) {
        return Err(GatewayError::Validation(format!(
            "'{}' does not support '{}'",
            property,
            method.as_str()
        )));
    }
    Ok((method, property))
}

/// POST /sensor/command/:method/:property - Send a command to target sensors.
async fn sensor_command(
    State(state): State<Arc<AppState>>,
    Path((method, property)): Path<(String, String)>,
    Json(request): Json<SensorCommandRequest>,
) -> Result<(StatusCode, Json<SensorAck>)> {
    let (method, property) = parse_command(&method, &property)?;

    if request.target.target_sensors.is_empty() {
        return Err(GatewayError::Validation(
            "at least one target sensor is required".to_string(),
        ));
    }
    state
        .services
        .registry
        .verify_registered(&request.target.target_sensors)
        .await?;

    let command = match method {
        CommandMethod::Set => SensorCommand::set(request.target, property, request.property_value),
        CommandMethod::Get => SensorCommand::get(request.target, property),
    };
    let ack = state.services.sensors.send(&command).await?;

    Ok((StatusCode::ACCEPTED, Json(ack)))
}

/// POST /gateway/command/set/gateway-model - Upload a model to the local inference service.
async fn set_gateway_model(
    State(state): State<Arc<AppState>>,
    Json(model): Json<GatewayModel>,
) -> Result<StatusCode> {
    state.services.inference.upload_model(&model).await?;
    Ok(StatusCode::ACCEPTED)
}
