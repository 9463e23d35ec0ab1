//! Georef HTTP service binary.
//!
//! # Configuration
//!
//! - `GEOREF_DATA_PATH` - Path to the SQLite dataset (default: /data/georef.db)
//! - `SERVICE_PORT` - HTTP port (default: 8080)
//! - `NEAREST_STRATEGY` - `index` (default) or `scan`
//! - `RUST_LOG` - Log level (default: info)
//! - `LOG_FORMAT` - Log format: json (default) or text
//! - `METRICS_ENABLED` - Set to `false` to disable Prometheus metrics
//!
//! On Unix, `SIGHUP` reloads the dataset without restarting.

use std::net::SocketAddr;

use tracing::{error, info, warn};

use georef_service::router;
use georef_service_shared::{
    init_logging, init_metrics, AppState, LoggingConfig, MetricsConfig, MetricsError,
    ServiceConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_config = LoggingConfig::from_env();
    init_logging(&logging_config);

    let metrics_config = MetricsConfig::from_env();
    match init_metrics(&metrics_config) {
        Ok(()) => {}
        Err(MetricsError::Disabled) => info!("metrics disabled"),
        // Metrics are optional; keep serving without them.
        Err(e) => warn!(error = %e, "failed to initialize metrics, continuing without metrics"),
    }

    let config = ServiceConfig::from_env();
    info!(
        data_path = %config.data_path.display(),
        port = config.port,
        strategy = %config.strategy,
        "starting georef service"
    );

    let state = AppState::load(&config.data_path, config.strategy).map_err(|e| {
        error!(error = %e, path = %config.data_path.display(), "failed to load application state");
        e
    })?;

    {
        let snapshot = state.snapshot();
        info!(
            countries = snapshot.dataset().countries().len(),
            cities = snapshot.dataset().cities().len(),
            geocoded = snapshot.dataset().geocoded_count(),
            "application state loaded"
        );
    }

    spawn_reload_on_sighup(state.clone());

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!(addr = %addr, "listening on");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

#[cfg(unix)]
fn spawn_reload_on_sighup(state: AppState) {
    use tokio::signal::unix::{signal, SignalKind};

    let mut hangups = match signal(SignalKind::hangup()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!(error = %e, "failed to install SIGHUP handler, reload disabled");
            return;
        }
    };

    tokio::spawn(async move {
        while hangups.recv().await.is_some() {
            info!("SIGHUP received, reloading dataset");
            let state = state.clone();
            match tokio::task::spawn_blocking(move || state.reload()).await {
                Ok(Ok(snapshot)) => info!(
                    cities = snapshot.dataset().cities().len(),
                    "dataset reloaded"
                ),
                Ok(Err(e)) => error!(error = %e, "dataset reload failed, keeping current snapshot"),
                Err(e) => error!(error = %e, "dataset reload task failed"),
            }
        }
    });
}

#[cfg(not(unix))]
fn spawn_reload_on_sighup(_state: AppState) {}
