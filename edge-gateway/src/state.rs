//! Shared application state.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::clients::{
    self, CloudClient, CloudSink, DeviceRegistry, EdgexCommandChannel, InferenceClient,
    InferenceService, MetadataClient, SensorControl, SensorControlClient,
};
use crate::commands::CommandService;
use crate::config::{Config, ServicesConfig};
use crate::dispatch::{CommandDispatcher, DeviceChannel};
use crate::error::Result;
use crate::inference::{InferenceRouter, RoutingPolicy};
use crate::queue::CommandQueueStore;

/// External collaborators of the gateway.
#[derive(Clone)]
pub struct Services {
    pub registry: Arc<dyn DeviceRegistry>,
    pub inference: Arc<dyn InferenceService>,
    pub sensors: Arc<dyn SensorControl>,
    pub cloud: Arc<dyn CloudSink>,
    pub devices: Arc<dyn DeviceChannel>,
}

impl Services {
    /// HTTP clients for every configured service, sharing one connection pool.
    pub fn from_config(config: &ServicesConfig) -> Result<Self> {
        let http = clients::http_client(config)?;

        Ok(Self {
            registry: Arc::new(MetadataClient::new(http.clone(), &config.metadata_url)),
            inference: Arc::new(InferenceClient::new(http.clone(), &config.inference_url)),
            sensors: Arc::new(SensorControlClient::new(http.clone(), &config.sensor_url)),
            cloud: Arc::new(CloudClient::new(http.clone(), &config.cloud_url)),
            devices: Arc::new(EdgexCommandChannel::new(http, &config.command_url)),
        })
    }
}

pub struct AppState {
    pub config: Config,
    pub services: Services,
    pub commands: CommandService,
    pub router: InferenceRouter,
    /// Parent of the cancellation token handed to every routed reading.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(
        config: Config,
        store: CommandQueueStore,
        services: Services,
        shutdown: CancellationToken,
    ) -> Self {
        let commands = CommandService::new(
            store,
            services.registry.clone(),
            CommandDispatcher::new(services.devices.clone()),
        );

        let router = InferenceRouter::new(
            &services,
            &config.gateway.name,
            &config.inference,
            RoutingPolicy::from(&config.inference),
        );

        Self {
            config,
            services,
            commands,
            router,
            shutdown,
        }
    }
}
