//! In-process command queue backend.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use edge_gateway_common::CommandRecord;

use super::QueueBackend;
use crate::error::Result;

/// Queues held in memory, keyed by device. Lost on restart.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    queues: RwLock<HashMap<String, Vec<CommandRecord>>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl QueueBackend for MemoryBackend {
    fn backend_type(&self) -> &'static str {
        "memory"
    }

    async fn append(&self, device_id: &str, record: CommandRecord) -> Result<()> {
        let mut queues = self.queues.write().await;
        queues
            .entry(device_id.to_string())
            .or_default()
            .push(record);
        Ok(())
    }

    async fn snapshot(&self, device_id: &str) -> Result<Vec<CommandRecord>> {
        let queues = self.queues.read().await;
        Ok(queues.get(device_id).cloned().unwrap_or_default())
    }

    async fn pop_all(&self, device_id: &str) -> Result<Vec<CommandRecord>> {
        // Read and removal happen under one write guard.
        let mut queues = self.queues.write().await;
        Ok(queues.remove(device_id).unwrap_or_default())
    }

    async fn discard(&self, device_id: &str) -> Result<usize> {
        let mut queues = self.queues.write().await;
        Ok(queues.remove(device_id).map(|q| q.len()).unwrap_or(0))
    }
}
