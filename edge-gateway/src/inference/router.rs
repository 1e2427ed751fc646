use std::sync::Arc;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use edge_gateway_common::{InferenceLayer, LatencyBenchmark, SensorReading};

use super::benchmark::LatencyBenchmarker;
use super::heuristic::{ControlAction, HeuristicController};
use super::poller::PredictionPoller;
use crate::clients::{CloudSink, DeviceRegistry, InferenceService};
use crate::config::InferenceConfig;
use crate::error::{GatewayError, Result};
use crate::state::Services;

/// Per-deployment routing behaviour, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutingPolicy {
    /// Apply heuristic feedback from gateway predictions.
    pub adaptive: bool,
    /// Emit latency telemetry for gateway predictions.
    pub latency_benchmark: bool,
}

impl From<&InferenceConfig> for RoutingPolicy {
    fn from(config: &InferenceConfig) -> Self {
        Self {
            adaptive: config.adaptive,
            latency_benchmark: config.latency_benchmark,
        }
    }
}

/// What happened to a routed reading.
#[derive(Debug, Clone, Serialize)]
pub struct RoutedReading {
    pub layer: InferenceLayer,
    pub reading: SensorReading,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<ControlAction>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<LatencyBenchmark>,
}

impl RoutedReading {
    fn exported(layer: InferenceLayer, reading: SensorReading) -> Self {
        Self {
            layer,
            reading,
            task_id: None,
            action: None,
            benchmark: None,
        }
    }
}

/// Routes each reading to the layer its descriptor names.
pub struct InferenceRouter {
    registry: Arc<dyn DeviceRegistry>,
    inference: Arc<dyn InferenceService>,
    cloud: Arc<dyn CloudSink>,
    poller: PredictionPoller,
    heuristic: HeuristicController,
    benchmarker: LatencyBenchmarker,
    policy: RoutingPolicy,
}

impl InferenceRouter {
    pub fn new(
        services: &Services,
        gateway_name: &str,
        config: &InferenceConfig,
        policy: RoutingPolicy,
    ) -> Self {
        Self {
            registry: services.registry.clone(),
            inference: services.inference.clone(),
            cloud: services.cloud.clone(),
            poller: PredictionPoller::new(
                services.inference.clone(),
                config.polling_interval(),
                config.poll_timeout(),
            ),
            heuristic: HeuristicController::new(services.sensors.clone(), gateway_name),
            benchmarker: LatencyBenchmarker::new(services.cloud.clone()),
            policy,
        }
    }

    pub fn policy(&self) -> RoutingPolicy {
        self.policy
    }

    pub async fn route(
        &self,
        mut reading: SensorReading,
        cancel: &CancellationToken,
    ) -> Result<RoutedReading> {
        let layer = reading.inference_descriptor.inference_layer()?;
        self.registry
            .verify_registered(&[reading.device_name.clone()])
            .await?;
        reading.ensure_uuid();

        tracing::debug!(sensor = %reading.device_name, layer = %layer, "Routing reading");

        match layer {
            InferenceLayer::Sensor => {
                if reading.inference_descriptor.prediction.is_none() {
                    return Err(GatewayError::Validation(
                        "sensor-layer reading carries no prediction".to_string(),
                    ));
                }
                self.cloud.export_prediction_result(&reading).await?;
                Ok(RoutedReading::exported(layer, reading))
            }
            InferenceLayer::Cloud => {
                self.cloud.export_prediction_request(&reading).await?;
                Ok(RoutedReading::exported(layer, reading))
            }
            InferenceLayer::Gateway => self.route_to_gateway(reading, cancel).await,
        }
    }

    async fn route_to_gateway(
        &self,
        mut reading: SensorReading,
        cancel: &CancellationToken,
    ) -> Result<RoutedReading> {
        let handle = self.inference.submit(&reading).await?;
        let result = self.poller.poll(&handle.task_id, cancel).await?;

        reading.inference_descriptor.prediction = Some(result.prediction);
        self.cloud.export_prediction_result(&reading).await?;

        let action = if self.policy.adaptive {
            self.heuristic
                .apply(&reading.device_name, result.heuristic_result)
                .await?
        } else {
            None
        };

        let benchmark = if self.policy.latency_benchmark {
            Some(self.benchmarker.record(&reading).await)
        } else {
            None
        };

        Ok(RoutedReading {
            layer: InferenceLayer::Gateway,
            reading,
            task_id: Some(handle.task_id),
            action,
            benchmark,
        })
    }
}
