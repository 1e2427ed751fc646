//! Device control commands and their queued representation.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kinds of control command an operator can queue for a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommandKind {
    /// Push a new predictive model to the device.
    PredictiveModelUpdate,
    /// Update device configuration (e.g. measurement interval).
    DeviceConfig,
    Ready,
    Start,
    Stop,
    Reset,
}

/// A command kind string that is not part of the weight table.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown command kind '{0}'")]
pub struct UnknownCommandKind(pub String);

impl CommandKind {
    /// All command kinds for iteration.
    pub const ALL: [CommandKind; 6] = [
        CommandKind::PredictiveModelUpdate,
        CommandKind::DeviceConfig,
        CommandKind::Ready,
        CommandKind::Start,
        CommandKind::Stop,
        CommandKind::Reset,
    ];

    /// Static weight reported to devices when they check in.
    pub fn weight(self) -> u32 {
        match self {
            CommandKind::PredictiveModelUpdate => 2,
            CommandKind::DeviceConfig
            | CommandKind::Ready
            | CommandKind::Start
            | CommandKind::Stop
            | CommandKind::Reset => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CommandKind::PredictiveModelUpdate => "predictive-model-update",
            CommandKind::DeviceConfig => "device-config",
            CommandKind::Ready => "ready",
            CommandKind::Start => "start",
            CommandKind::Stop => "stop",
            CommandKind::Reset => "reset",
        }
    }
}

impl FromStr for CommandKind {
    type Err = UnknownCommandKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| UnknownCommandKind(s.to_string()))
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A queued record that cannot be turned into a [`Command`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidRecord {
    #[error(transparent)]
    UnknownKind(#[from] UnknownCommandKind),
    #[error("corrupt payload for '{kind}': {reason}")]
    CorruptPayload { kind: String, reason: String },
}

/// Persisted form of a queued command.
///
/// `kind` is kept as the raw string: queues can be written by other
/// processes, so a record is only trusted once it is turned into a
/// [`Command`]. A stored payload that does not decode is kept as
/// `payload_error` and reported when the record is executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandRecord {
    pub kind: String,
    #[serde(default)]
    pub payload: serde_json::Value,
    #[serde(default)]
    pub enqueued_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload_error: Option<String>,
}

impl CommandRecord {
    pub fn new(kind: CommandKind, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.as_str().to_string(),
            payload,
            enqueued_at: Some(Utc::now()),
            payload_error: None,
        }
    }

    /// Record whose stored payload could not be decoded.
    pub fn corrupt(kind: String, reason: String, enqueued_at: Option<DateTime<Utc>>) -> Self {
        Self {
            kind,
            payload: serde_json::Value::Null,
            enqueued_at,
            payload_error: Some(reason),
        }
    }

    /// Weight of this record. Unknown kinds count as 1 so a queue holding
    /// only foreign records still reports work and gets drained.
    pub fn weight(&self) -> u32 {
        self.kind
            .parse::<CommandKind>()
            .map(CommandKind::weight)
            .unwrap_or(1)
    }
}

/// A validated command addressed to a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Command {
    pub device_id: String,
    pub kind: CommandKind,
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Command {
    pub fn from_record(device_id: &str, record: CommandRecord) -> Result<Self, InvalidRecord> {
        let kind = record.kind.parse()?;
        if let Some(reason) = record.payload_error {
            return Err(InvalidRecord::CorruptPayload {
                kind: record.kind,
                reason,
            });
        }
        Ok(Self {
            device_id: device_id.to_string(),
            kind,
            payload: record.payload,
        })
    }
}
