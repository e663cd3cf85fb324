use std::{path::PathBuf, sync::Arc};

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

use omb_content::{Endpoints, HttpContentProvider};
use omb_core::{
    config::Config,
    dispatch::{WorkerConfig, WorkerRegistry},
    extract::CommandExtractor,
    handlers::CommandHandlers,
    messaging::{
        port::ChatTransport,
        throttled::{ThrottleConfig, ThrottledTransport},
    },
    poller::UpdatePoller,
};
use omb_telegram::TelegramTransport;

#[derive(Debug, Parser)]
#[command(name = "omb", version, about = "Telegram command bot")]
struct Cli {
    /// Path to a JSON config file (`token`, `http_proxy`, `log_path`).
    /// Without it, configuration is read from the environment.
    #[arg(long, value_name = "/path/to/config")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => Config::load().context("failed to load config from environment")?,
    };
    let _log_guard = omb_core::logging::init("omb", cfg.log_path.as_deref())?;

    let telegram: Arc<dyn ChatTransport> = Arc::new(TelegramTransport::from_config(&cfg)?);
    let username = telegram
        .get_me()
        .await
        .context("failed to fetch bot identity")?;

    // Picture sets fan out into several sends; space them to avoid 429s.
    let transport: Arc<dyn ChatTransport> = Arc::new(ThrottledTransport::new(
        telegram,
        ThrottleConfig::default(),
    ));
    let content = Arc::new(HttpContentProvider::new(
        Endpoints::default(),
        cfg.http_proxy.as_deref(),
    )?);
    let handlers = Arc::new(CommandHandlers::new(
        transport.clone(),
        content,
        cfg.about_url.clone(),
        cfg.telegram_message_limit,
    ));
    let registry = WorkerRegistry::new(handlers, WorkerConfig::from(&cfg));

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            shutdown_signal().await;
            info!("shutdown signal received");
            cancel.cancel();
        }
    });

    info!("@{username} is running");
    UpdatePoller::new(transport, CommandExtractor::new(&username), registry.clone())
        .run(cancel)
        .await;

    info!(
        workers = registry.active_workers(),
        "waiting for chat workers to drain"
    );
    registry.shutdown().await;
    info!("@{username} stopped");

    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = sigterm => {}
    }
}
