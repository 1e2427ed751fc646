//! Inference layers and heuristic feedback codes.
//!
//! Both are carried on the wire as small integers and the two code spaces
//! happen to overlap (0/1/2). They are kept as separate enumerations and the
//! only link between them is [`HeuristicResult::target_layer`].

use serde::{Deserialize, Serialize};

/// Execution site chosen to run the predictive model for a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum InferenceLayer {
    /// Model runs on the sensor itself.
    Sensor,
    /// Model runs on the gateway's local inference service.
    Gateway,
    /// Model runs in the cloud backend.
    Cloud,
}

/// A layer code outside of the known inference layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unknown inference layer code {0}")]
pub struct UnknownLayer(pub i64);

impl InferenceLayer {
    pub const ALL: [InferenceLayer; 3] = [
        InferenceLayer::Sensor,
        InferenceLayer::Gateway,
        InferenceLayer::Cloud,
    ];

    /// Wire code of this layer.
    pub fn code(self) -> i64 {
        match self {
            InferenceLayer::Sensor => 0,
            InferenceLayer::Gateway => 1,
            InferenceLayer::Cloud => 2,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, UnknownLayer> {
        Self::ALL
            .into_iter()
            .find(|layer| layer.code() == code)
            .ok_or(UnknownLayer(code))
    }
}

impl TryFrom<i64> for InferenceLayer {
    type Error = UnknownLayer;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        Self::from_code(code)
    }
}

impl From<InferenceLayer> for i64 {
    fn from(layer: InferenceLayer) -> Self {
        layer.code()
    }
}

impl std::fmt::Display for InferenceLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InferenceLayer::Sensor => write!(f, "sensor"),
            InferenceLayer::Gateway => write!(f, "gateway"),
            InferenceLayer::Cloud => write!(f, "cloud"),
        }
    }
}

/// Feedback signal produced by a completed gateway-side prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeuristicResult {
    /// The sensor should be put into its error state.
    Error,
    /// Inference should move down to the sensor.
    Sensor,
    /// Inference should stay on the gateway. No action.
    Gateway,
    /// Inference should move up to the cloud.
    Cloud,
}

impl HeuristicResult {
    pub fn code(self) -> i64 {
        match self {
            HeuristicResult::Error => -1,
            HeuristicResult::Sensor => 0,
            HeuristicResult::Gateway => 1,
            HeuristicResult::Cloud => 2,
        }
    }

    /// Decode a raw heuristic code. Unrecognized codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -1 => Some(HeuristicResult::Error),
            0 => Some(HeuristicResult::Sensor),
            1 => Some(HeuristicResult::Gateway),
            2 => Some(HeuristicResult::Cloud),
            _ => None,
        }
    }

    /// Layer a sensor should transition to, if this result asks for one.
    ///
    /// `Gateway` is the no-op code and `Error` is a state change rather than
    /// a layer transition, so both map to `None`.
    pub fn target_layer(self) -> Option<InferenceLayer> {
        match self {
            HeuristicResult::Sensor => Some(InferenceLayer::Sensor),
            HeuristicResult::Cloud => Some(InferenceLayer::Cloud),
            HeuristicResult::Gateway | HeuristicResult::Error => None,
        }
    }
}

impl std::fmt::Display for HeuristicResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HeuristicResult::Error => write!(f, "error"),
            HeuristicResult::Sensor => write!(f, "sensor"),
            HeuristicResult::Gateway => write!(f, "gateway"),
            HeuristicResult::Cloud => write!(f, "cloud"),
        }
    }
}
