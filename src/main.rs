use std::time::Duration;

use tracing::info;

use staywatch::config::Config;
use staywatch::service::{Backend, Service};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env()?;
    staywatch::observability::init(config.metrics_port)?;

    // One channel handle and one cache store for the life of the process.
    let backend = Backend::from_config(&config)?;

    info!("staywatch starting");
    info!("  backend: {}", backend.name());
    info!("  subscribe timeout: {:?}", config.subscribe_timeout);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    let service = Service::start(&config, backend);

    wait_for_signal().await?;
    info!("shutdown signal received, stopping background tasks");
    service.stop(Duration::from_secs(10)).await;

    info!("staywatch stopped");
    Ok(())
}

async fn wait_for_signal() -> std::io::Result<()> {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            r = ctrl_c => r?,
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await?;
    }
    Ok(())
}
