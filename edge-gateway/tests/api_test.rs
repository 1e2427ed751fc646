use axum::body::Body;
use http::{Method, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use edge_gateway::app;
use edge_gateway::test_util::{
    RecordingDeviceChannel, RecordingSensorControl, ScriptedInferenceService, TestHarness,
};
use edge_gateway_common::{CommandKind, SensorProperty};

async fn send(harness: &TestHarness, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if body.is_some() {
        builder = builder.header("Content-Type", "application/json");
    }
    let request = builder
        .body(match body {
            Some(b) => Body::from(serde_json::to_vec(&b).unwrap()),
            None => Body::empty(),
        })
        .unwrap();

    let response = app(harness.state()).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

fn gateway_reading(device: &str) -> Value {
    json!({
        "device_name": device,
        "readings": [{"resource_name": "temperature", "value": 22.1}],
        "inference_descriptor": {
            "inference_layer": 1,
            "send_timestamp": chrono::Utc::now().timestamp_millis()
        }
    })
}

#[tokio::test]
async fn test_health() {
    let harness = TestHarness::new();
    let (status, body) = send(&harness, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_queued_commands_delivered_at_check_in() {
    let harness = TestHarness::new();

    let (status, _) = send(
        &harness,
        Method::POST,
        "/cloud/devices/start",
        Some(json!({"devices": ["dev1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, _) = send(
        &harness,
        Method::POST,
        "/cloud/devices/device-config",
        Some(json!({"devices": ["dev1"], "payload": {"interval": 500}})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);

    let (status, body) = send(
        &harness,
        Method::POST,
        "/edgex/pending-commands",
        Some(json!({"deviceName": "dev1", "readings": [{"resourceName": "ping", "value": "1"}]})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weight"], 2);
    assert_eq!(body["executed"], 2);
    assert_eq!(
        harness.devices.kinds(),
        vec![CommandKind::Start, CommandKind::DeviceConfig]
    );

    let (_, body) = send(
        &harness,
        Method::POST,
        "/edgex/pending-commands",
        Some(json!({"device_name": "dev1"})),
    )
    .await;
    assert_eq!(body["weight"], 0);
    assert_eq!(harness.devices.commands().len(), 2);
}

#[tokio::test]
async fn test_check_in_rejects_multiple_readings() {
    let harness = TestHarness::new();
    let (status, body) = send(
        &harness,
        Method::POST,
        "/edgex/pending-commands",
        Some(json!({"deviceName": "dev1", "readings": [{}, {}]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "validation_error");
}

#[tokio::test]
async fn test_enqueue_unknown_kind() {
    let harness = TestHarness::new();
    let (status, body) = send(
        &harness,
        Method::POST,
        "/cloud/devices/self-destruct",
        Some(json!({"devices": ["dev1"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "unknown_command_kind");
}

#[tokio::test]
async fn test_enqueue_unregistered_device_enqueues_nothing() {
    let harness = TestHarness::new();
    let (status, body) = send(
        &harness,
        Method::POST,
        "/cloud/devices/reset",
        Some(json!({"devices": ["dev1", "ghost"]})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "device_not_registered");

    let (status, body) = send(&harness, Method::GET, "/cloud/queues/dev1", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["weight"], 0);
}

#[tokio::test]
async fn test_inspect_and_clear_queue() {
    let harness = TestHarness::new();
    send(
        &harness,
        Method::POST,
        "/cloud/devices/predictive-model-update",
        Some(json!({"devices": ["dev2"], "payload": {"model_size": 3, "b64_encoded_model": "AAAA"}})),
    )
    .await;

    let (_, body) = send(&harness, Method::GET, "/cloud/queues/dev2", None).await;
    assert_eq!(body["weight"], 2);
    assert_eq!(body["commands"][0]["kind"], "predictive-model-update");

    let (status, body) = send(&harness, Method::DELETE, "/cloud/queues/dev2", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["removed"], 1);

    let (_, body) = send(&harness, Method::POST, "/edgex/pending-commands", Some(json!({"device_name": "dev2"}))).await;
    assert_eq!(body["executed"], 0);
}

#[tokio::test]
async fn test_failed_delivery_surfaces_error() {
    let harness = TestHarness::new().with_devices(RecordingDeviceChannel::failing_on(CommandKind::Stop));
    send(&harness, Method::POST, "/cloud/devices/stop", Some(json!({"devices": ["dev1"]}))).await;

    let (status, body) = send(
        &harness,
        Method::POST,
        "/edgex/pending-commands",
        Some(json!({"device_name": "dev1"})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["type"], "command_delivery_failed");
}

#[tokio::test]
async fn test_gateway_reading_moves_sensor_to_cloud() {
    let harness = TestHarness::new().with_inference(ScriptedInferenceService::succeeding(0.77, 2));

    let (status, body) = send(&harness, Method::POST, "/export/reading", Some(gateway_reading("sensor-a"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reading"]["inference_descriptor"]["prediction"], 0.77);
    assert_eq!(body["task_id"], "task-1");

    let layer_commands = harness.sensors.sent_for(SensorProperty::InferenceLayer);
    assert_eq!(layer_commands.len(), 1);
    assert_eq!(layer_commands[0].target.target_sensors, vec!["sensor-a".to_string()]);
    assert_eq!(layer_commands[0].target.gateway_name, "gw-test");
    assert_eq!(layer_commands[0].property_value, json!(2));
    assert_eq!(harness.sensors.sent().len(), 1);
}

#[tokio::test]
async fn test_failed_prediction_task() {
    let harness = TestHarness::new().with_inference(ScriptedInferenceService::failing());
    let (status, body) = send(&harness, Method::POST, "/export/reading", Some(gateway_reading("sensor-a"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["type"], "prediction_task_failed");
}

#[tokio::test]
async fn test_invalid_layer_rejected() {
    let harness = TestHarness::new();
    let mut reading = gateway_reading("sensor-a");
    reading["inference_descriptor"]["inference_layer"] = json!(9);

    let (status, body) = send(&harness, Method::POST, "/export/reading", Some(reading)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "invalid_inference_layer");
}

#[tokio::test]
async fn test_shutdown_cancels_gateway_reading() {
    let harness = TestHarness::new().with_inference(ScriptedInferenceService::pending_forever());
    harness.shutdown.cancel();

    let (status, body) = send(&harness, Method::POST, "/export/reading", Some(gateway_reading("sensor-a"))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["type"], "cancelled");
}

#[tokio::test]
async fn test_sensor_command_forwarded() {
    let harness = TestHarness::new();
    let (status, body) = send(
        &harness,
        Method::POST,
        "/sensor/command/get/sensor-config",
        Some(json!({"target": {"gateway_name": "gw-test", "target_sensors": ["sensor-b"]}})),
    )
    .await;

    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["command_uuids"][0], "cmd-1");
    assert_eq!(harness.sensors.sent_for(SensorProperty::SensorConfig).len(), 1);
}

#[tokio::test]
async fn test_sensor_command_rejection_relays_status() {
    let harness = TestHarness::new().with_sensors(RecordingSensorControl::rejecting(404));
    let (status, body) = send(
        &harness,
        Method::POST,
        "/sensor/command/set/sensor-state",
        Some(json!({"target": {"gateway_name": "gw-test", "target_sensors": ["sensor-a"]}, "property_value": "IDLE"})),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["type"], "command_delivery_failed");
    assert_eq!(harness.sensors.sent().len(), 1);
}

#[tokio::test]
async fn test_sensor_command_validation() {
    let harness = TestHarness::new();
    let target = json!({"target": {"gateway_name": "gw-test", "target_sensors": ["sensor-a"]}});

    let (status, _) = send(&harness, Method::POST, "/sensor/command/get/sensor-model", Some(target.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &harness,
        Method::POST,
        "/sensor/command/set/sensor-state",
        Some(json!({"target": {"gateway_name": "gw-test", "target_sensors": ["ghost"]}, "property_value": "IDLE"})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["type"], "device_not_registered");
    assert!(harness.sensors.sent().is_empty());
}

#[tokio::test]
async fn test_gateway_model_upload() {
    let harness = TestHarness::new();
    let (status, _) = send(
        &harness,
        Method::POST,
        "/gateway/command/set/gateway-model",
        Some(json!({"model_size": 4, "b64_encoded_model": "AAAA"})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(harness.inference.models().len(), 1);
}

#[tokio::test]
async fn test_latency_benchmark_export_respects_policy() {
    let benchmark = json!({
        "sensor_name": "sensor-a",
        "reading_uuid": "r-1",
        "send_timestamp": 1000,
        "recv_timestamp": 1040,
        "latency_ms": 40
    });

    let disabled = TestHarness::new();
    let (status, _) = send(&disabled, Method::POST, "/export/inference-latency-benchmark", Some(benchmark.clone())).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(disabled.cloud.total(), 0);

    let enabled = TestHarness::new().latency_benchmark(true);
    let (status, _) = send(&enabled, Method::POST, "/export/inference-latency-benchmark", Some(benchmark)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(enabled.cloud.exports("inference-latency-benchmark").len(), 1);
}

#[tokio::test]
async fn test_sensor_response_stored() {
    let harness = TestHarness::new();
    let (status, _) = send(
        &harness,
        Method::POST,
        "/store/sensor/response/get/inference-layer",
        Some(json!({"device_name": "sensor-a", "inference_layer": 0})),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(harness.cloud.exports("sensor-response").len(), 1);

    let (status, _) = send(&harness, Method::POST, "/store/sensor/response/get/sensor-model", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
