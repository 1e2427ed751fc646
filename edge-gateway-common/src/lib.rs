//! Edge Gateway Common Types
//!
//! Wire types shared by the gateway and its collaborators: device commands,
//! sensor readings, prediction tasks and sensor control messages.

pub mod command;
pub mod layer;
pub mod prediction;
pub mod reading;
pub mod sensor;

pub use command::{Command, CommandKind, CommandRecord, InvalidRecord, UnknownCommandKind};
pub use layer::{HeuristicResult, InferenceLayer, UnknownLayer};
pub use prediction::{GatewayModel, PredictionResult, PredictionTask, TaskHandle, TaskStatus};
pub use reading::{InferenceDescriptor, LatencyBenchmark, ResourceReading, SensorReading};
pub use sensor::{
    CommandMethod, GatewayTarget, SensorAck, SensorCommand, SensorProperty, SensorState,
};
