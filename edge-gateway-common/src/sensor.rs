//! Sensor control commands sent through the sensor-control service.
//!
//! Every command is addressed to a gateway and a set of sensors behind it,
//! names one sensor property and either reads (`get`) or writes (`set`) it.
//! `set` commands are acknowledged with HTTP 202. `get` commands are also
//! acknowledged with 202 and the value arrives later as a callback, keyed by
//! the returned command uuids.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::layer::InferenceLayer;

/// Gateway plus the sensors a command targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayTarget {
    pub gateway_name: String,
    pub target_sensors: Vec<String>,
}

impl GatewayTarget {
    pub fn single(gateway_name: &str, sensor_name: &str) -> Self {
        Self {
            gateway_name: gateway_name.to_string(),
            target_sensors: vec![sensor_name.to_string()],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandMethod {
    Get,
    Set,
}

impl CommandMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            CommandMethod::Get => "get",
            CommandMethod::Set => "set",
        }
    }
}

impl FromStr for CommandMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "get" => Ok(CommandMethod::Get),
            "set" => Ok(CommandMethod::Set),
            other => Err(format!("unknown command method '{}'", other)),
        }
    }
}

/// Sensor properties reachable through the sensor-control service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SensorProperty {
    SensorState,
    InferenceLayer,
    SensorConfig,
    SensorModel,
    #[serde(rename = "inf-latency-bench")]
    InferenceLatencyBenchmark,
}

impl SensorProperty {
    pub const ALL: [SensorProperty; 5] = [
        SensorProperty::SensorState,
        SensorProperty::InferenceLayer,
        SensorProperty::SensorConfig,
        SensorProperty::SensorModel,
        SensorProperty::InferenceLatencyBenchmark,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            SensorProperty::SensorState => "sensor-state",
            SensorProperty::InferenceLayer => "inference-layer",
            SensorProperty::SensorConfig => "sensor-config",
            SensorProperty::SensorModel => "sensor-model",
            SensorProperty::InferenceLatencyBenchmark => "inf-latency-bench",
        }
    }

    /// Whether the property can be accessed with the given method.
    ///
    /// Models and benchmark triggers are write-only.
    pub fn supports(self, method: CommandMethod) -> bool {
        match self {
            SensorProperty::SensorState
            | SensorProperty::InferenceLayer
            | SensorProperty::SensorConfig => true,
            SensorProperty::SensorModel | SensorProperty::InferenceLatencyBenchmark => {
                method == CommandMethod::Set
            }
        }
    }
}

impl FromStr for SensorProperty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SensorProperty::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown sensor property '{}'", s))
    }
}

impl std::fmt::Display for SensorProperty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operational state of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SensorState {
    Ready,
    Working,
    Idle,
    Error,
}

/// A command for the sensor-control service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorCommand {
    pub target: GatewayTarget,
    pub method: CommandMethod,
    pub property_name: SensorProperty,
    #[serde(default)]
    pub property_value: serde_json::Value,
}

impl SensorCommand {
    pub fn set(target: GatewayTarget, property: SensorProperty, value: serde_json::Value) -> Self {
        Self {
            target,
            method: CommandMethod::Set,
            property_name: property,
            property_value: value,
        }
    }

    pub fn get(target: GatewayTarget, property: SensorProperty) -> Self {
        Self {
            target,
            method: CommandMethod::Get,
            property_name: property,
            property_value: serde_json::Value::Null,
        }
    }

    pub fn set_sensor_state(target: GatewayTarget, state: SensorState) -> Self {
        Self::set(
            target,
            SensorProperty::SensorState,
            serde_json::json!(state),
        )
    }

    pub fn set_inference_layer(target: GatewayTarget, layer: InferenceLayer) -> Self {
        Self::set(
            target,
            SensorProperty::InferenceLayer,
            serde_json::json!(layer),
        )
    }

    /// Path of this command on the sensor-control service.
    pub fn path(&self) -> String {
        format!(
            "/sensor/command/{}/{}",
            self.method.as_str(),
            self.property_name.as_str()
        )
    }
}

/// Acknowledgement returned by the sensor-control service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorAck {
    /// Ids that correlate a `get` command with its later callback.
    #[serde(default)]
    pub command_uuids: Option<Vec<String>>,
}
