use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use edge_gateway::{app, logging, AppState, CommandQueueStore, Config, Services};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;

    logging::init(&config.logging.level);

    tracing::info!(
        gateway = %config.gateway.name,
        adaptive = config.inference.adaptive,
        latency_benchmark = config.inference.latency_benchmark,
        "Starting edge gateway"
    );

    let store = CommandQueueStore::from_config(&config.store)?;
    let services = Services::from_config(&config.services)?;
    let shutdown = CancellationToken::new();

    let state = Arc::new(AppState::new(
        config.clone(),
        store,
        services,
        shutdown.clone(),
    ));

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("Edge gateway stopped");
    Ok(())
}

/// Resolve on Ctrl-C and cancel every in-flight prediction poll.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
    shutdown.cancel();
}
