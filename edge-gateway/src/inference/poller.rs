use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use edge_gateway_common::{PredictionResult, TaskStatus};

use crate::clients::InferenceService;
use crate::error::{GatewayError, Result};

/// Waits for a prediction task to reach a terminal state.
///
/// The task status is polled at a fixed interval. FAILURE is terminal and is
/// never retried. The wait ends early when the token is cancelled or the
/// deadline passes.
pub struct PredictionPoller {
    service: Arc<dyn InferenceService>,
    interval: Duration,
    timeout: Option<Duration>,
}

impl PredictionPoller {
    pub fn new(
        service: Arc<dyn InferenceService>,
        interval: Duration,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            service,
            interval,
            timeout,
        }
    }

    pub async fn poll(&self, task_id: &str, cancel: &CancellationToken) -> Result<PredictionResult> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::info!(task_id, "Prediction poll cancelled");
                Err(GatewayError::Cancelled)
            }
            outcome = with_deadline(self.timeout, self.poll_until_terminal(task_id)) => outcome,
        }
    }

    async fn poll_until_terminal(&self, task_id: &str) -> Result<PredictionResult> {
        loop {
            let task = self.service.task_status(task_id).await?;
            if !task.status.is_terminal() {
                tokio::time::sleep(self.interval).await;
                continue;
            }

            return match (task.status, task.result) {
                (TaskStatus::Success, Some(result)) => Ok(result),
                (TaskStatus::Success, None) => Err(GatewayError::PredictionTaskFailed {
                    task_id: task_id.to_string(),
                    reason: "task succeeded without a result".to_string(),
                }),
                _ => Err(GatewayError::PredictionTaskFailed {
                    task_id: task_id.to_string(),
                    reason: task
                        .error
                        .unwrap_or_else(|| "task reported FAILURE".to_string()),
                }),
            };
        }
    }
}

async fn with_deadline<F>(timeout: Option<Duration>, fut: F) -> Result<PredictionResult>
where
    F: Future<Output = Result<PredictionResult>>,
{
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| {
                GatewayError::TimeoutExceeded(u64::try_from(limit.as_millis()).unwrap_or(u64::MAX))
            })?,
        None => fut.await,
    }
}
