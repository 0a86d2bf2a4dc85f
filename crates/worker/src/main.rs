//! `autorender-worker`: headless-browser render worker.
//!
//! Connects to the server's worker endpoint, screenshots each announced
//! job and replies with the base64 PNG. See
//! [`WorkerConfig::from_env`](autorender_worker::config::WorkerConfig::from_env)
//! for the environment variables it reads.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use autorender_worker::client;
use autorender_worker::config::WorkerConfig;
use autorender_worker::fetch::RenderedClient;
use autorender_worker::job::JobRunner;
use autorender_worker::reconnect::ReconnectConfig;
use autorender_worker::screenshot::BrowserScreenshotter;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "autorender_worker=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = WorkerConfig::from_env();
    tracing::info!(
        ws_url = %config.ws_url,
        http_url = %config.http_url,
        browser = %config.browser_bin,
        width = config.window_size.0,
        height = config.window_size.1,
        attempts = config.screenshot_attempts,
        "Starting autorender-worker",
    );

    let runner = JobRunner::new(
        Arc::new(RenderedClient::new(config.http_url.clone())),
        Arc::new(BrowserScreenshotter::from_config(&config)),
        config.screenshot_attempts,
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    client::run(&config.ws_url, &runner, ReconnectConfig::default(), &cancel).await;
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), stopping"),
        () = terminate => tracing::info!("Received SIGTERM, stopping"),
    }
}
