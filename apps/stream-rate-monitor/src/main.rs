//! Stream Rate Monitor Binary
//!
//! Starts the payment stream rate monitor.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin stream-rate-monitor
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `MODULE_ADDRESS`: Address that published the payment stream module
//! - `MODULE_NAME`: Payment stream module name
//!
//! ## Optional
//! - `APTOS_NODE_URL`: Fullnode REST endpoint (default: <https://fullnode.testnet.aptoslabs.com>)
//! - `RATE_MONITOR_ACCOUNT`: Account to watch at startup
//! - `RATE_MONITOR_POLL_INTERVAL_MS`: Delay between refresh cycles (default: 5000)
//! - `RATE_MONITOR_HTTP_PORT`: Rate and health HTTP port (default: 8091)
//! - `RATE_MONITOR_HTTP_TIMEOUT_SECS`: View call timeout (default: 10)
//! - `RATE_MONITOR_RETRY_MAX_ATTEMPTS`: View call attempts (default: 3)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use stream_rate_monitor::infrastructure::telemetry;
use stream_rate_monitor::{
    AptosViewClient, MonitorSettings, RateMonitorService, RateServer, RateServerState,
    RateSnapshot, init_metrics,
};
use tokio::signal;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    load_dotenv();

    telemetry::init();

    tracing::info!("Starting stream rate monitor");

    let _metrics_handle = init_metrics();

    let settings = MonitorSettings::from_env()?;
    log_config(&settings);

    let shutdown_token = CancellationToken::new();

    let client = Arc::new(AptosViewClient::new(settings.aptos_config())?);
    let monitor = Arc::new(RateMonitorService::with_config(
        settings.monitor_config(),
        client,
        shutdown_token.clone(),
    ));

    if settings.watched_account.is_some() {
        monitor.set_account(settings.watched_account.clone());
    }

    let rate_state = Arc::new(RateServerState::new(
        monitor.subscribe(),
        settings.monitor_config().poll_interval(),
    ));
    let rate_server = RateServer::new(
        settings.server.http_port,
        rate_state,
        shutdown_token.clone(),
    );

    monitor.start();
    spawn_rate_logger(monitor.subscribe(), shutdown_token.clone());

    let server_handle = tokio::spawn(async move {
        if let Err(e) = rate_server.run().await {
            tracing::error!(error = %e, "Rate server error");
        }
    });

    tracing::info!("Stream rate monitor ready");

    await_shutdown(shutdown_token).await;

    let _ = server_handle.await;

    tracing::info!("Stream rate monitor stopped");
    Ok(())
}

/// Log the scaled rate whenever its rendering changes.
fn spawn_rate_logger(
    mut snapshot_rx: watch::Receiver<RateSnapshot>,
    shutdown_token: CancellationToken,
) {
    tokio::spawn(async move {
        let mut last_display: Option<String> = None;
        loop {
            tokio::select! {
                () = shutdown_token.cancelled() => break,
                changed = snapshot_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let snapshot = snapshot_rx.borrow_and_update().clone();
                    // Named `rendered` because tracing's macros shadow locals
                    // called `display` (tokio-rs/tracing#2332).
                    let rendered = snapshot.display();
                    if last_display.as_deref() != Some(rendered.as_str()) {
                        tracing::info!(rate = %rendered, "Net rate updated");
                        last_display = Some(rendered);
                    }
                }
            }
        }
    });
}

/// Log the parsed configuration.
fn log_config(settings: &MonitorSettings) {
    tracing::info!(
        node_url = %settings.node_url,
        module_address = %settings.module_address,
        module_name = %settings.module_name,
        poll_interval_ms = settings.poll_interval_ms,
        http_port = settings.server.http_port,
        watched_account = settings
            .watched_account
            .as_ref()
            .map_or("none", |account| account.as_str()),
        "Configuration loaded"
    );
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    shutdown_token.cancel();
}
