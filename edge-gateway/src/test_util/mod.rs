//! In-process fakes for the services around the gateway.
//!
//! Used by unit tests and by the integration tests under `tests/`.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use edge_gateway_common::{
    Command, CommandKind, GatewayModel, LatencyBenchmark, PredictionResult, PredictionTask,
    SensorAck, SensorCommand, SensorProperty, SensorReading, TaskHandle, TaskStatus,
};

use crate::clients::{CloudSink, DeviceRegistry, InferenceService, SensorControl};
use crate::config::{
    Config, GatewayConfig, InferenceConfig, LoggingConfig, ServerConfig, ServicesConfig,
    StoreConfig,
};
use crate::dispatch::DeviceChannel;
use crate::error::{GatewayError, Result};
use crate::queue::CommandQueueStore;
use crate::state::{AppState, Services};

pub fn test_config() -> Config {
    Config {
        server: ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8000,
        },
        gateway: GatewayConfig {
            name: "gw-test".to_string(),
        },
        services: ServicesConfig {
            inference_url: "http://localhost:8001".to_string(),
            metadata_url: "http://localhost:8002".to_string(),
            sensor_url: "http://localhost:8003".to_string(),
            command_url: "http://localhost:59882/api/v2".to_string(),
            cloud_url: "http://localhost:9000".to_string(),
            request_timeout_secs: 5,
        },
        inference: InferenceConfig {
            polling_interval_ms: 5,
            poll_timeout_ms: 2_000,
            ..InferenceConfig::default()
        },
        store: StoreConfig::default(),
        logging: LoggingConfig {
            level: "debug".to_string(),
        },
    }
}

/// Registry that knows a fixed set of device names.
pub struct StaticRegistry {
    names: HashSet<String>,
}

impl StaticRegistry {
    pub fn new(names: &[&str]) -> Self {
        Self {
            names: names.iter().map(|n| n.to_string()).collect(),
        }
    }
}

#[async_trait]
impl DeviceRegistry for StaticRegistry {
    async fn verify_registered(&self, names: &[String]) -> Result<()> {
        match names.iter().find(|n| !self.names.contains(n.as_str())) {
            Some(unknown) => Err(GatewayError::DeviceNotRegistered(unknown.clone())),
            None => Ok(()),
        }
    }
}

/// Sensor control that records every command it is sent.
#[derive(Default)]
pub struct RecordingSensorControl {
    sent: Mutex<Vec<SensorCommand>>,
    reject_with: Option<u16>,
}

impl RecordingSensorControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acknowledge every command with `status` instead of 202.
    pub fn rejecting(status: u16) -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            reject_with: Some(status),
        }
    }

    pub fn sent(&self) -> Vec<SensorCommand> {
        self.sent.lock().unwrap().clone()
    }

    pub fn sent_for(&self, property: SensorProperty) -> Vec<SensorCommand> {
        self.sent()
            .into_iter()
            .filter(|c| c.property_name == property)
            .collect()
    }
}

#[async_trait]
impl SensorControl for RecordingSensorControl {
    async fn send(&self, command: &SensorCommand) -> Result<SensorAck> {
        self.sent.lock().unwrap().push(command.clone());
        match self.reject_with {
            Some(status) => Err(GatewayError::CommandDeliveryFailed {
                target: command.target.target_sensors.join(","),
                status: Some(status),
                reason: "rejected by fake".to_string(),
            }),
            None => Ok(SensorAck {
                command_uuids: Some(vec![format!("cmd-{}", self.sent.lock().unwrap().len())]),
            }),
        }
    }
}

/// Inference service replaying a script of task states.
///
/// The last scripted state repeats once the script is exhausted.
pub struct ScriptedInferenceService {
    script: Mutex<VecDeque<PredictionTask>>,
    submitted: Mutex<Vec<SensorReading>>,
    models: Mutex<Vec<GatewayModel>>,
    polls: AtomicUsize,
}

impl ScriptedInferenceService {
    pub fn new(states: Vec<(TaskStatus, Option<PredictionResult>)>) -> Self {
        let script = states
            .into_iter()
            .map(|(status, result)| PredictionTask {
                task_id: "task-1".to_string(),
                status,
                result,
                error: None,
            })
            .collect();
        Self {
            script: Mutex::new(script),
            submitted: Mutex::new(Vec::new()),
            models: Mutex::new(Vec::new()),
            polls: AtomicUsize::new(0),
        }
    }

    /// Pending once, then success with the given output.
    pub fn succeeding(prediction: f64, heuristic_result: i64) -> Self {
        Self::new(vec![
            (TaskStatus::Pending, None),
            (
                TaskStatus::Success,
                Some(PredictionResult {
                    prediction,
                    heuristic_result,
                }),
            ),
        ])
    }

    pub fn failing() -> Self {
        Self::new(vec![(TaskStatus::Failure, None)])
    }

    pub fn pending_forever() -> Self {
        Self::new(vec![(TaskStatus::Pending, None)])
    }

    pub fn submitted(&self) -> Vec<SensorReading> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn models(&self) -> Vec<GatewayModel> {
        self.models.lock().unwrap().clone()
    }

    pub fn poll_count(&self) -> usize {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceService for ScriptedInferenceService {
    async fn submit(&self, reading: &SensorReading) -> Result<TaskHandle> {
        self.submitted.lock().unwrap().push(reading.clone());
        Ok(TaskHandle {
            task_id: "task-1".to_string(),
        })
    }

    async fn task_status(&self, task_id: &str) -> Result<PredictionTask> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let mut task = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        }
        .ok_or_else(|| GatewayError::Validation("empty inference script".to_string()))?;
        task.task_id = task_id.to_string();
        Ok(task)
    }

    async fn upload_model(&self, model: &GatewayModel) -> Result<()> {
        self.models.lock().unwrap().push(model.clone());
        Ok(())
    }
}

/// Device channel that records executed commands.
#[derive(Default)]
pub struct RecordingDeviceChannel {
    executed: Mutex<Vec<Command>>,
    fail_on: Option<CommandKind>,
}

impl RecordingDeviceChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse commands of `kind`. Other commands succeed.
    pub fn failing_on(kind: CommandKind) -> Self {
        Self {
            executed: Mutex::new(Vec::new()),
            fail_on: Some(kind),
        }
    }

    pub fn commands(&self) -> Vec<Command> {
        self.executed.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<CommandKind> {
        self.commands().into_iter().map(|c| c.kind).collect()
    }
}

#[async_trait]
impl DeviceChannel for RecordingDeviceChannel {
    async fn execute(&self, command: &Command) -> Result<()> {
        if self.fail_on == Some(command.kind) {
            return Err(GatewayError::CommandDeliveryFailed {
                target: command.device_id.clone(),
                status: Some(500),
                reason: format!("{} refused", command.kind),
            });
        }
        self.executed.lock().unwrap().push(command.clone());
        Ok(())
    }
}

/// Cloud sink that records exports by endpoint name.
#[derive(Default)]
pub struct RecordingCloudSink {
    exports: Mutex<Vec<(&'static str, serde_json::Value)>>,
    fail_benchmarks: bool,
}

impl RecordingCloudSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject latency benchmark exports.
    pub fn failing_benchmarks() -> Self {
        Self {
            exports: Mutex::new(Vec::new()),
            fail_benchmarks: true,
        }
    }

    pub fn exports(&self, endpoint: &str) -> Vec<serde_json::Value> {
        self.exports
            .lock()
            .unwrap()
            .iter()
            .filter(|(name, _)| *name == endpoint)
            .map(|(_, body)| body.clone())
            .collect()
    }

    pub fn total(&self) -> usize {
        self.exports.lock().unwrap().len()
    }

    fn record(&self, endpoint: &'static str, body: serde_json::Value) {
        self.exports.lock().unwrap().push((endpoint, body));
    }
}

#[async_trait]
impl CloudSink for RecordingCloudSink {
    async fn export_sensor_reading(&self, reading: &serde_json::Value) -> Result<()> {
        self.record("sensor-reading", reading.clone());
        Ok(())
    }

    async fn export_prediction_request(&self, reading: &SensorReading) -> Result<()> {
        self.record("prediction-request", serde_json::json!(reading));
        Ok(())
    }

    async fn export_prediction_result(&self, reading: &SensorReading) -> Result<()> {
        self.record("prediction-result", serde_json::json!(reading));
        Ok(())
    }

    async fn export_latency_benchmark(&self, benchmark: &LatencyBenchmark) -> Result<()> {
        if self.fail_benchmarks {
            return Err(GatewayError::UpstreamRejected {
                service: "cloud",
                status: 500,
                body: "benchmark store down".to_string(),
            });
        }
        self.record("inference-latency-benchmark", serde_json::json!(benchmark));
        Ok(())
    }

    async fn store_sensor_response(
        &self,
        property: SensorProperty,
        response: &serde_json::Value,
    ) -> Result<()> {
        self.record("sensor-response", serde_json::json!({
            "property": property.as_str(),
            "response": response,
        }));
        Ok(())
    }
}

/// The full set of fakes wired into an [`AppState`].
pub struct TestHarness {
    pub config: Config,
    pub store: CommandQueueStore,
    pub registry: Arc<StaticRegistry>,
    pub inference: Arc<ScriptedInferenceService>,
    pub sensors: Arc<RecordingSensorControl>,
    pub cloud: Arc<RecordingCloudSink>,
    pub devices: Arc<RecordingDeviceChannel>,
    pub shutdown: CancellationToken,
}

impl TestHarness {
    /// Harness knowing `dev1`, `dev2`, `sensor-a` and `sensor-b`.
    pub fn new() -> Self {
        Self {
            config: test_config(),
            store: CommandQueueStore::in_memory(),
            registry: Arc::new(StaticRegistry::new(&["dev1", "dev2", "sensor-a", "sensor-b"])),
            inference: Arc::new(ScriptedInferenceService::succeeding(0.5, 1)),
            sensors: Arc::new(RecordingSensorControl::new()),
            cloud: Arc::new(RecordingCloudSink::new()),
            devices: Arc::new(RecordingDeviceChannel::new()),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_inference(mut self, inference: ScriptedInferenceService) -> Self {
        self.inference = Arc::new(inference);
        self
    }

    pub fn with_cloud(mut self, cloud: RecordingCloudSink) -> Self {
        self.cloud = Arc::new(cloud);
        self
    }

    pub fn with_sensors(mut self, sensors: RecordingSensorControl) -> Self {
        self.sensors = Arc::new(sensors);
        self
    }

    pub fn with_devices(mut self, devices: RecordingDeviceChannel) -> Self {
        self.devices = Arc::new(devices);
        self
    }

    pub fn adaptive(mut self, enabled: bool) -> Self {
        self.config.inference.adaptive = enabled;
        self
    }

    pub fn latency_benchmark(mut self, enabled: bool) -> Self {
        self.config.inference.latency_benchmark = enabled;
        self
    }

    pub fn services(&self) -> Services {
        Services {
            registry: self.registry.clone(),
            inference: self.inference.clone(),
            sensors: self.sensors.clone(),
            cloud: self.cloud.clone(),
            devices: self.devices.clone(),
        }
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::new(AppState::new(
            self.config.clone(),
            self.store.clone(),
            self.services(),
            self.shutdown.clone(),
        ))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
