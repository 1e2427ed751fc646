//! Operator-facing command queue operations and device check-in.

use std::sync::Arc;

use serde::Serialize;

use edge_gateway_common::{Command, CommandKind, CommandRecord};

use crate::clients::DeviceRegistry;
use crate::dispatch::CommandDispatcher;
use crate::error::{GatewayError, Result};
use crate::queue::CommandQueueStore;

/// Result of a device checking in for pending commands.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckIn {
    pub device_name: String,
    /// Total weight of the batch drained at check-in.
    pub weight: u32,
    pub executed: usize,
}

/// Snapshot of a device's queue.
#[derive(Debug, Clone, Serialize)]
pub struct PendingCommands {
    pub device_name: String,
    pub weight: u32,
    pub commands: Vec<CommandRecord>,
}

#[derive(Clone)]
pub struct CommandService {
    store: CommandQueueStore,
    registry: Arc<dyn DeviceRegistry>,
    dispatcher: CommandDispatcher,
}

impl CommandService {
    pub fn new(
        store: CommandQueueStore,
        registry: Arc<dyn DeviceRegistry>,
        dispatcher: CommandDispatcher,
    ) -> Self {
        Self {
            store,
            registry,
            dispatcher,
        }
    }

    pub fn store(&self) -> &CommandQueueStore {
        &self.store
    }

    /// Queue one command for each device.
    ///
    /// The kind and the whole device batch are validated before anything is
    /// enqueued.
    pub async fn enqueue(
        &self,
        devices: &[String],
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<Vec<Command>> {
        if devices.is_empty() {
            return Err(GatewayError::Validation(
                "at least one device is required".to_string(),
            ));
        }
        let kind: CommandKind = kind.parse()?;
        self.registry.verify_registered(devices).await?;

        let mut queued = Vec::with_capacity(devices.len());
        for device in devices {
            queued.push(self.store.enqueue(device, kind.as_str(), payload.clone()).await?);
        }

        tracing::info!(kind = %kind, devices = devices.len(), "Queued device command");
        Ok(queued)
    }

    /// Drain the device's queue and execute it.
    ///
    /// The reported weight is taken from the drained batch, so it always
    /// matches what runs even when check-ins or enqueues race.
    pub async fn check_in(&self, device: &str) -> Result<CheckIn> {
        self.registry
            .verify_registered(&[device.to_string()])
            .await?;

        let records = self.store.drain_all(device).await?;
        let weight = records.iter().map(CommandRecord::weight).sum();
        if records.is_empty() {
            return Ok(CheckIn {
                device_name: device.to_string(),
                weight,
                executed: 0,
            });
        }

        let report = self.dispatcher.execute(device, records).await?;

        Ok(CheckIn {
            device_name: device.to_string(),
            weight,
            executed: report.executed,
        })
    }

    pub async fn pending(&self, device: &str) -> Result<PendingCommands> {
        self.registry
            .verify_registered(&[device.to_string()])
            .await?;

        let commands = self.store.pending(device).await?;
        Ok(PendingCommands {
            device_name: device.to_string(),
            weight: commands.iter().map(CommandRecord::weight).sum(),
            commands,
        })
    }

    pub async fn clear(&self, device: &str) -> Result<usize> {
        self.registry
            .verify_registered(&[device.to_string()])
            .await?;
        self.store.clear(device).await
    }
}
