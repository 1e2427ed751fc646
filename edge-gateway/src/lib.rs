//! Edge gateway.
//!
//! Mediates between field sensors, the local inference service and the cloud:
//! per-device command queues delivered at check-in, and per-reading routing
//! of inference to the sensor, the gateway or the cloud.

pub mod clients;
pub mod commands;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod inference;
pub mod logging;
pub mod queue;
pub mod routes;
pub mod state;
pub mod test_util;

pub use commands::{CheckIn, CommandService};
pub use config::Config;
pub use dispatch::{CommandDispatcher, DeviceChannel, DispatchReport};
pub use error::{GatewayError, Result};
pub use inference::{InferenceRouter, RoutedReading, RoutingPolicy};
pub use queue::CommandQueueStore;
pub use state::{AppState, Services};

use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Full application router with middleware applied.
pub fn app(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    routes::router()
        .with_state(state)
        .layer(middleware::from_fn(logging::request_logger))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
