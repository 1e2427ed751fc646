//! SQLite-backed command queue.

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, TransactionBehavior};

use edge_gateway_common::CommandRecord;

use super::QueueBackend;
use crate::error::{GatewayError, Result};

/// Command queues persisted in a SQLite database.
///
/// Rows are ordered by their autoincrement id, which gives FIFO order per
/// device. Draining selects and deletes inside one IMMEDIATE transaction, so
/// another process sharing the database file cannot interleave a drain.
pub struct SqliteBackend {
    conn: Mutex<Connection>,
}

impl SqliteBackend {
    pub fn new(database_url: &str) -> Result<Self> {
        let path = database_url.strip_prefix("sqlite:").unwrap_or(database_url);

        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| GatewayError::Store(e.to_string()))?;
            }
        }

        let conn = Connection::open(path)?;
        Self::init(&conn)?;

        tracing::info!("Command queue database opened: {}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init(conn: &Connection) -> Result<()> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS pending_commands (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                device_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                payload TEXT NOT NULL,
                enqueued_at TEXT
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_pending_commands_device ON pending_commands(device_id, id)",
            [],
        )?;

        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| GatewayError::Store(e.to_string()))
    }
}

type RawRow = (String, String, Option<String>);

fn select_rows(conn: &Connection, device_id: &str) -> Result<Vec<RawRow>> {
    let mut stmt = conn.prepare(
        "SELECT kind, payload, enqueued_at FROM pending_commands
         WHERE device_id = ?1 ORDER BY id ASC",
    )?;
    let rows = stmt
        .query_map(params![device_id], |row| {
            Ok((row.get(0)?, row.get(1)?, row.get(2)?))
        })?
        .collect::<std::result::Result<Vec<RawRow>, _>>()?;
    Ok(rows)
}

/// Rows may be written by other processes. A payload that does not decode
/// stays in the batch and fails when that record is executed.
fn to_record((kind, payload, enqueued_at): RawRow) -> CommandRecord {
    let enqueued_at = enqueued_at
        .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
        .map(|dt| dt.with_timezone(&Utc));

    match serde_json::from_str(&payload) {
        Ok(payload) => CommandRecord {
            kind,
            payload,
            enqueued_at,
            payload_error: None,
        },
        Err(e) => {
            tracing::warn!(kind = %kind, error = %e, "Queued command has a corrupt payload");
            CommandRecord::corrupt(kind, e.to_string(), enqueued_at)
        }
    }
}

#[async_trait]
impl QueueBackend for SqliteBackend {
    fn backend_type(&self) -> &'static str {
        "sqlite"
    }

    async fn append(&self, device_id: &str, record: CommandRecord) -> Result<()> {
        let payload = serde_json::to_string(&record.payload)
            .map_err(|e| GatewayError::Store(e.to_string()))?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO pending_commands (device_id, kind, payload, enqueued_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                device_id,
                record.kind,
                payload,
                record.enqueued_at.map(|ts| ts.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    async fn snapshot(&self, device_id: &str) -> Result<Vec<CommandRecord>> {
        let rows = {
            let conn = self.lock()?;
            select_rows(&conn, device_id)?
        };
        Ok(rows.into_iter().map(to_record).collect())
    }

    async fn pop_all(&self, device_id: &str) -> Result<Vec<CommandRecord>> {
        let rows = {
            let mut conn = self.lock()?;
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let rows = select_rows(&tx, device_id)?;
            tx.execute(
                "DELETE FROM pending_commands WHERE device_id = ?1",
                params![device_id],
            )?;
            tx.commit()?;
            rows
        };
        Ok(rows.into_iter().map(to_record).collect())
    }

    async fn discard(&self, device_id: &str) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute(
            "DELETE FROM pending_commands WHERE device_id = ?1",
            params![device_id],
        )?;
        Ok(removed)
    }
}
