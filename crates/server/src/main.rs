mod actions;
mod bootstrap;
mod health;
mod http;
mod signing;

use std::time::Duration;

use anyhow::Result;
use swapdesk_core::config::{AppConfig, LoadOptions};
use tokio::sync::watch;

fn init_logging(config: &AppConfig) {
    use swapdesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Logging must be live before bootstrap emits anything.
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let server = http::spawn(
        &app.config.server.bind_address,
        app.config.server.port,
        http::router(&app),
        shutdown_rx,
    )
    .await?;

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let chat_runner = app.chat_runner;
    let chat = tokio::spawn(async move { chat_runner.start().await });

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        action_base_url = %app.config.server.action_base_url(),
        "swapdesk-server started"
    );
    wait_for_shutdown().await?;
    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "swapdesk-server stopping"
    );

    // Ignored when the server task already ended.
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(grace, server).await.is_err() {
        tracing::warn!(
            event_name = "system.server.shutdown_timeout",
            correlation_id = "shutdown",
            grace_secs = grace.as_secs(),
            "in-flight requests did not drain before the grace period"
        );
    }
    chat.abort();
    if let Some(pool) = app.db_pool {
        pool.close().await;
    }

    Ok(())
}

async fn wait_for_shutdown() -> Result<()> {
    tokio::signal::ctrl_c().await?;
    Ok(())
}
