//! Operator device commands and device check-in.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::commands::{CheckIn, PendingCommands};
use crate::error::{GatewayError, Result};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/cloud/devices/:kind", post(enqueue_command))
        .route("/cloud/queues/:device", get(pending_commands).delete(clear_commands))
        .route("/edgex/pending-commands", post(check_in))
}

#[derive(Debug, Deserialize)]
struct EnqueueRequest {
    devices: Vec<String>,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Debug, Serialize)]
struct EnqueueResponse {
    kind: String,
    devices: Vec<String>,
}

/// POST /cloud/devices/:kind - Queue a command for a batch of devices.
async fn enqueue_command(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
    Json(request): Json<EnqueueRequest>,
) -> Result<(StatusCode, Json<EnqueueResponse>)> {
    let queued = state
        .commands
        .enqueue(&request.devices, &kind, request.payload)
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(EnqueueResponse {
            kind,
            devices: queued.into_iter().map(|c| c.device_id).collect(),
        }),
    ))
}

/// GET /cloud/queues/:device - Inspect a device's queue.
async fn pending_commands(
    State(state): State<Arc<AppState>>,
    Path(device): Path<String>,
) -> Result<Json<PendingCommands>> {
    Ok(Json(state.commands.pending(&device).await?))
}

/// DELETE /cloud/queues/:device - Drop a device's queue without executing it.
async fn clear_commands(
    State(state): State<Arc<AppState>>,
    Path(device): Path<String>,
) -> Result<Json<serde_json::Value>> {
    let removed = state.commands.clear(&device).await?;
    Ok(Json(serde_json::json!({
        "device_name": device,
        "removed": removed,
    })))
}

/// Device check-in as sent by the EdgeX device service.
#[derive(Debug, Deserialize)]
struct CheckInRequest {
    #[serde(alias = "deviceName")]
    device_name: String,
    #[serde(default)]
    readings: Option<Vec<serde_json::Value>>,
}

/// POST /edgex/pending-commands - Report queue weight and execute the queue.
async fn check_in(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CheckInRequest>,
) -> Result<Json<CheckIn>> {
    if let Some(readings) = &request.readings {
        if readings.len() != 1 {
            return Err(GatewayError::Validation(format!(
                "exactly one reading is allowed, got {}",
                readings.len()
            )));
        }
    }

    Ok(Json(state.commands.check_in(&request.device_name).await?))
}
