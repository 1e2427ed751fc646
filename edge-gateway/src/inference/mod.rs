//! Adaptive inference routing.
//!
//! A reading names the layer its inference should run on. Sensor-layer
//! readings already carry a prediction and are exported as-is. Cloud-layer
//! readings are forwarded to the cloud. Gateway-layer readings go through the
//! local inference service; the completed prediction may move the sensor to
//! another layer (adaptive mode) and may be timed (latency benchmark).

mod benchmark;
mod heuristic;
mod poller;
mod router;

pub use benchmark::LatencyBenchmarker;
pub use heuristic::{ControlAction, HeuristicController};
pub use poller::PredictionPoller;
pub use router::{InferenceRouter, RoutedReading, RoutingPolicy};
