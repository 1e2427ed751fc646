//! HTTP API.

pub mod callbacks;
pub mod devices;
pub mod health;
pub mod sensor;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Build the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .merge(health::router())
        .merge(devices::router())
        .merge(sensor::router())
        .merge(callbacks::router())
}
