//! Error types for the edge gateway.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use edge_gateway_common::{InvalidRecord, UnknownCommandKind, UnknownLayer};

/// Errors surfaced to the caller of a gateway request.
///
/// Nothing is retried automatically. The first error on a request's
/// execution path is the one reported.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Device '{0}' is not registered")]
    DeviceNotRegistered(String),

    #[error("Unknown command kind '{0}'")]
    UnknownCommandKind(String),

    #[error("Invalid inference layer {0}: must be sensor (0), gateway (1) or cloud (2)")]
    InvalidInferenceLayer(i64),

    #[error("Prediction task {task_id} failed: {reason}")]
    PredictionTaskFailed { task_id: String, reason: String },

    #[error("Command delivery to {target} failed: {reason}")]
    CommandDeliveryFailed {
        target: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("{service} unavailable: {reason}")]
    UpstreamUnavailable { service: &'static str, reason: String },

    #[error("{service} returned HTTP {status}: {body}")]
    UpstreamRejected {
        service: &'static str,
        status: u16,
        body: String,
    },

    #[error("Timed out after {0} ms")]
    TimeoutExceeded(u64),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Command store error: {0}")]
    Store(String),
}

impl GatewayError {
    pub fn upstream(service: &'static str, err: reqwest::Error) -> Self {
        GatewayError::UpstreamUnavailable {
            service,
            reason: err.to_string(),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            GatewayError::Validation(_) => "validation_error",
            GatewayError::DeviceNotRegistered(_) => "device_not_registered",
            GatewayError::UnknownCommandKind(_) => "unknown_command_kind",
            GatewayError::InvalidInferenceLayer(_) => "invalid_inference_layer",
            GatewayError::PredictionTaskFailed { .. } => "prediction_task_failed",
            GatewayError::CommandDeliveryFailed { .. } => "command_delivery_failed",
            GatewayError::UpstreamUnavailable { .. } => "upstream_unavailable",
            GatewayError::UpstreamRejected { .. } => "upstream_rejected",
            GatewayError::TimeoutExceeded(_) => "timeout_exceeded",
            GatewayError::Cancelled => "cancelled",
            GatewayError::Store(_) => "store_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::Validation(_)
            | GatewayError::DeviceNotRegistered(_)
            | GatewayError::UnknownCommandKind(_)
            | GatewayError::InvalidInferenceLayer(_) => StatusCode::BAD_REQUEST,
            GatewayError::PredictionTaskFailed { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::CommandDeliveryFailed { status, .. } => relayed(*status),
            GatewayError::UpstreamRejected { status, .. } => relayed(Some(*status)),
            GatewayError::UpstreamUnavailable { .. } | GatewayError::Cancelled => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            GatewayError::TimeoutExceeded(_) => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Relay an upstream status when it is an error status, otherwise 502.
fn relayed(status: Option<u16>) -> StatusCode {
    status
        .and_then(|s| StatusCode::from_u16(s).ok())
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::BAD_GATEWAY)
}

impl From<UnknownCommandKind> for GatewayError {
    fn from(err: UnknownCommandKind) -> Self {
        GatewayError::UnknownCommandKind(err.0)
    }
}

impl From<InvalidRecord> for GatewayError {
    fn from(err: InvalidRecord) -> Self {
        match err {
            InvalidRecord::UnknownKind(kind) => kind.into(),
            corrupt @ InvalidRecord::CorruptPayload { .. } => GatewayError::Store(corrupt.to_string()),
        }
    }
}

impl From<UnknownLayer> for GatewayError {
    fn from(err: UnknownLayer) -> Self {
        GatewayError::InvalidInferenceLayer(err.0)
    }
}

impl From<rusqlite::Error> for GatewayError {
    fn from(err: rusqlite::Error) -> Self {
        GatewayError::Store(err.to_string())
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::warn!(error = %self, "Request failed");
        }

        let body = Json(json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, GatewayError>;
