//! Prediction task types exchanged with the local inference service.

use serde::{Deserialize, Serialize};

/// Handle returned by the inference service when a reading is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskHandle {
    pub task_id: String,
}

/// Lifecycle state of a prediction task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Success,
    Failure,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

/// Output of a successful prediction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub prediction: f64,
    /// Raw heuristic code, see [`crate::HeuristicResult`].
    pub heuristic_result: i64,
}

/// Status report for a prediction task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionTask {
    pub task_id: String,
    pub status: TaskStatus,
    #[serde(default)]
    pub result: Option<PredictionResult>,
    /// Failure detail, if the service provides one.
    #[serde(default)]
    pub error: Option<String>,
}

/// Model upload forwarded to the inference service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayModel {
    pub model_size: u64,
    pub b64_encoded_model: String,
}
