use std::sync::Arc;

use serde::Serialize;

use edge_gateway_common::{
    GatewayTarget, HeuristicResult, InferenceLayer, SensorCommand, SensorState,
};

use crate::clients::SensorControl;
use crate::error::Result;

/// Control command emitted in response to heuristic feedback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", content = "value", rename_all = "snake_case")]
pub enum ControlAction {
    SetSensorState(SensorState),
    SetInferenceLayer(InferenceLayer),
}

impl ControlAction {
    /// Action for a raw heuristic code. The no-op code and unrecognized codes
    /// yield `None`.
    pub fn for_code(code: i64) -> Option<Self> {
        let heuristic = HeuristicResult::from_code(code)?;
        match heuristic {
            HeuristicResult::Error => Some(ControlAction::SetSensorState(SensorState::Error)),
            other => other.target_layer().map(ControlAction::SetInferenceLayer),
        }
    }

    fn into_command(self, target: GatewayTarget) -> SensorCommand {
        match self {
            ControlAction::SetSensorState(state) => SensorCommand::set_sensor_state(target, state),
            ControlAction::SetInferenceLayer(layer) => {
                SensorCommand::set_inference_layer(target, layer)
            }
        }
    }
}

/// Turns heuristic feedback from gateway predictions into sensor commands.
pub struct HeuristicController {
    sensors: Arc<dyn SensorControl>,
    gateway_name: String,
}

impl HeuristicController {
    pub fn new(sensors: Arc<dyn SensorControl>, gateway_name: &str) -> Self {
        Self {
            sensors,
            gateway_name: gateway_name.to_string(),
        }
    }

    /// Send the command for `code` to `sensor` and wait for its
    /// acknowledgement. Returns the action taken, if any.
    pub async fn apply(&self, sensor: &str, code: i64) -> Result<Option<ControlAction>> {
        let Some(action) = ControlAction::for_code(code) else {
            tracing::debug!(sensor, heuristic = code, "No control action for heuristic result");
            return Ok(None);
        };

        let command = action.into_command(GatewayTarget::single(&self.gateway_name, sensor));
        self.sensors.send(&command).await?;

        tracing::info!(sensor, heuristic = code, action = ?action, "Applied heuristic control action");
        Ok(Some(action))
    }
}
