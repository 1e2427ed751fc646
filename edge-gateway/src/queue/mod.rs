//! Per-device command queues.
//!
//! Operators enqueue control commands for a device; the device picks them up
//! the next time it checks in. Queues are FIFO per device and drained in one
//! atomic step so that concurrent check-ins never see the same command twice.
//!
//! Storage is pluggable through [`QueueBackend`]:
//! - [`MemoryBackend`] keeps queues in process memory
//! - [`SqliteBackend`] persists them across restarts

mod memory;
mod sqlite;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

use std::sync::Arc;

use async_trait::async_trait;
use edge_gateway_common::{Command, CommandKind, CommandRecord};

use crate::config::{StoreBackend, StoreConfig};
use crate::error::Result;

/// Storage primitives behind a command queue.
///
/// `append` and `pop_all` must each be atomic per device: appends for one
/// device are applied in call order and `pop_all` returns and removes the
/// whole queue so that no concurrent caller can observe the same records.
#[async_trait]
pub trait QueueBackend: Send + Sync {
    /// Identifier of this backend (e.g., "memory", "sqlite").
    fn backend_type(&self) -> &'static str;

    /// Append a record to the tail of a device's queue.
    async fn append(&self, device_id: &str, record: CommandRecord) -> Result<()>;

    /// Current queue contents, oldest first. Does not modify the queue.
    async fn snapshot(&self, device_id: &str) -> Result<Vec<CommandRecord>>;

    /// Remove and return the whole queue, oldest first.
    async fn pop_all(&self, device_id: &str) -> Result<Vec<CommandRecord>>;

    /// Drop the queue without returning it. Returns the number of records removed.
    async fn discard(&self, device_id: &str) -> Result<usize>;
}

/// Command queue store used by the operator and check-in paths.
#[derive(Clone)]
pub struct CommandQueueStore {
    backend: Arc<dyn QueueBackend>,
}

impl CommandQueueStore {
    pub fn new(backend: Arc<dyn QueueBackend>) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    /// Build the store selected by configuration.
    pub fn from_config(config: &StoreConfig) -> Result<Self> {
        let backend: Arc<dyn QueueBackend> = match config.backend {
            StoreBackend::Memory => Arc::new(MemoryBackend::new()),
            StoreBackend::Sqlite => Arc::new(SqliteBackend::new(&config.path)?),
        };
        tracing::info!("Command queue store initialized ({})", backend.backend_type());
        Ok(Self::new(backend))
    }

    /// Validate `kind` against the weight table and append a command.
    pub async fn enqueue(
        &self,
        device_id: &str,
        kind: &str,
        payload: serde_json::Value,
    ) -> Result<Command> {
        let kind: CommandKind = kind.parse()?;
        let record = CommandRecord::new(kind, payload.clone());
        self.backend.append(device_id, record).await?;

        tracing::debug!(device = device_id, kind = %kind, "Enqueued command");

        Ok(Command {
            device_id: device_id.to_string(),
            kind,
            payload,
        })
    }

    /// Sum of the weights of all queued commands.
    pub async fn total_weight(&self, device_id: &str) -> Result<u32> {
        let records = self.backend.snapshot(device_id).await?;
        Ok(records.iter().map(CommandRecord::weight).sum())
    }

    /// Take every queued command for the device, leaving the queue empty.
    pub async fn drain_all(&self, device_id: &str) -> Result<Vec<CommandRecord>> {
        let records = self.backend.pop_all(device_id).await?;
        if !records.is_empty() {
            tracing::debug!(device = device_id, count = records.len(), "Drained command queue");
        }
        Ok(records)
    }

    /// Discard queued commands without executing them.
    pub async fn clear(&self, device_id: &str) -> Result<usize> {
        let removed = self.backend.discard(device_id).await?;
        if removed > 0 {
            tracing::info!(device = device_id, removed, "Cleared command queue");
        }
        Ok(removed)
    }

    /// Read-only view of a device's queue.
    pub async fn pending(&self, device_id: &str) -> Result<Vec<CommandRecord>> {
        self.backend.snapshot(device_id).await
    }
}
