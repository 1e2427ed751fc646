//! Executes drained command batches against a device's control channel.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use edge_gateway_common::{Command, CommandRecord};

use crate::error::Result;

/// Control channel through which a command reaches a device.
#[async_trait]
pub trait DeviceChannel: Send + Sync {
    async fn execute(&self, command: &Command) -> Result<()>;
}

/// Outcome of a fully executed batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub executed: usize,
}

/// Runs a drained batch in order, one command at a time.
///
/// The first failure aborts the rest of the batch and is returned to the
/// caller. Commands already executed are not rolled back and the remaining
/// ones are not re-queued.
#[derive(Clone)]
pub struct CommandDispatcher {
    channel: Arc<dyn DeviceChannel>,
}

impl CommandDispatcher {
    pub fn new(channel: Arc<dyn DeviceChannel>) -> Self {
        Self { channel }
    }

    pub async fn execute(
        &self,
        device_id: &str,
        records: Vec<CommandRecord>,
    ) -> Result<DispatchReport> {
        let total = records.len();

        for (index, record) in records.into_iter().enumerate() {
            let outcome = match Command::from_record(device_id, record) {
                Ok(command) => self.channel.execute(&command).await.map(|_| command),
                Err(e) => Err(e.into()),
            };

            match outcome {
                Ok(command) => {
                    tracing::info!(
                        device = device_id,
                        kind = %command.kind,
                        "Executed command {}/{}",
                        index + 1,
                        total
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        device = device_id,
                        executed = index,
                        dropped = total - index - 1,
                        error = %e,
                        "Command batch aborted"
                    );
                    return Err(e);
                }
            }
        }

        Ok(DispatchReport { executed: total })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::test_util::RecordingDeviceChannel;
    use edge_gateway_common::CommandKind;
    use serde_json::json;

    fn record(kind: &str) -> CommandRecord {
        CommandRecord {
            kind: kind.to_string(),
            payload: json!(null),
            enqueued_at: None,
            payload_error: None,
        }
    }

    #[tokio::test]
    async fn test_executes_in_order() {
        let channel = Arc::new(RecordingDeviceChannel::new());
        let dispatcher = CommandDispatcher::new(channel.clone());

        let report = dispatcher
            .execute("dev1", vec![record("start"), record("device-config"), record("stop")])
            .await
            .unwrap();

        assert_eq!(report.executed, 3);
        assert_eq!(
            channel.kinds(),
            vec![CommandKind::Start, CommandKind::DeviceConfig, CommandKind::Stop]
        );
    }

    #[tokio::test]
    async fn test_unknown_kind_aborts_remaining_batch() {
        let channel = Arc::new(RecordingDeviceChannel::new());
        let dispatcher = CommandDispatcher::new(channel.clone());

        let result = dispatcher
            .execute("dev1", vec![record("start"), record("reboot"), record("stop")])
            .await;

        assert!(matches!(result, Err(GatewayError::UnknownCommandKind(ref k)) if k == "reboot"));
        assert_eq!(channel.kinds(), vec![CommandKind::Start]);
    }

    #[tokio::test]
    async fn test_corrupt_payload_reported_at_its_position() {
        let channel = Arc::new(RecordingDeviceChannel::new());
        let dispatcher = CommandDispatcher::new(channel.clone());
        let corrupt = CommandRecord::corrupt("stop".to_string(), "key must be a string".to_string(), None);

        let result = dispatcher
            .execute("dev1", vec![record("start"), corrupt, record("reset")])
            .await;

        assert!(matches!(result, Err(GatewayError::Store(ref msg)) if msg.contains("corrupt payload for 'stop'")));
        assert_eq!(channel.kinds(), vec![CommandKind::Start]);
    }

    #[tokio::test]
    async fn test_channel_failure_stops_batch() {
        let channel = Arc::new(RecordingDeviceChannel::failing_on(CommandKind::Ready));
        let dispatcher = CommandDispatcher::new(channel.clone());

        let result = dispatcher
            .execute("dev1", vec![record("ready"), record("start")])
            .await;

        assert!(matches!(result, Err(GatewayError::CommandDeliveryFailed { .. })));
        assert!(channel.kinds().is_empty());
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let channel = Arc::new(RecordingDeviceChannel::new());
        let dispatcher = CommandDispatcher::new(channel.clone());

        let report = dispatcher.execute("dev1", Vec::new()).await.unwrap();
        assert_eq!(report.executed, 0);
    }
}
