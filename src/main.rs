use anyhow::Context;
use pochta_tracker::config::{listen_port_from_env, ServiceConfig};
use pochta_tracker::server;
use pochta_tracker::service::HttpTrackingService;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

// RUST_LOG wins, then LOG_LEVEL, then info.
fn log_filter() -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    std::env::var("LOG_LEVEL")
        .ok()
        .filter(|level| !level.trim().is_empty())
        .and_then(|level| EnvFilter::try_new(level.trim()).ok())
        .unwrap_or_else(|| EnvFilter::new("info"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the environment may already be set.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter())
        .with_target(false)
        .init();

    let config = Arc::new(ServiceConfig::from_env().context("invalid service configuration")?);
    let port = listen_port_from_env().context("invalid PORT")?;
    info!(
        single_url = %config.single.url,
        batch_url = %config.batch.url,
        timeout_ms = config.timeout_ms(),
        port,
        "pochta_tracker starting"
    );

    let service = Arc::new(HttpTrackingService::from_config(config));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "signal_handler_failed");
            return;
        }
        info!("shutdown_requested");
        let _ = shutdown_tx.send(true);
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    server::serve(addr, service, shutdown_rx)
        .await
        .map_err(|e| anyhow::anyhow!(e))
        .context("tracking server failed")?;

    info!("pochta_tracker stopped");
    Ok(())
}
