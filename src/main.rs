use anyhow::{Context, Result};
use clap::Parser;
use sabremote::{
    app::{config::Config, state::AppState},
    cli::{self, Cli},
    popup::run_popup,
    store::Store,
};
use std::path::PathBuf;
use tracing_subscriber::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first to get verbose flag
    let cli = Cli::parse();

    // Set config directory override before anything resolves paths
    if let Some(ref config_dir) = cli.config {
        sabremote::util::paths::set_config_dir_override(Some(config_dir.clone()));
    }

    // Get logs directory (creates if needed)
    let logs_dir = sabremote::util::paths::get_logs_dir().unwrap_or_else(|_| PathBuf::from("."));
    std::fs::create_dir_all(&logs_dir).ok();

    // Set up daily rotating file appender
    let file_appender = tracing_appender::rolling::daily(&logs_dir, "sabremote.jsonl");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Set log level based on verbose flag
    let log_level = if cli.verbose {
        tracing::Level::TRACE
    } else {
        tracing::Level::INFO
    };

    // JSON lines for structured logs
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(tracing_subscriber::filter::LevelFilter::from_level(
                    log_level,
                )),
        )
        .init();

    tracing::info!("Starting sabremote {}...", env!("CARGO_PKG_VERSION"));
    if cli.verbose {
        tracing::info!("Verbose logging enabled (TRACE level)");
    }
    tracing::trace!("CLI arguments: {:?}", cli);
    if let Some(ref config_dir) = cli.config {
        tracing::info!("Using config directory override: {:?}", config_dir);
    }

    // Load configuration
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("Falling back to default settings: {:#}", e);
            Config::default()
        }
    };
    tracing::info!(
        "Config loaded: refresh_rate={}s, request_timeout={}s",
        config.general.refresh_rate,
        config.connection.request_timeout
    );

    let store_path = sabremote::util::paths::get_store_path()?;
    let store = Store::open(&store_path)
        .await
        .with_context(|| format!("Failed to open state file {:?}", store_path))?;

    // Route based on CLI arguments
    match cli.command {
        Some(command) => {
            // One-shot command: no polling timer
            let (state, _coordinator) = AppState::start(config, store, false).await?;
            let exit_code = cli::handler::handle_command(command, state).await;
            drop(_guard);
            std::process::exit(exit_code);
        }
        None => {
            let (state, coordinator) = AppState::start(config, store, true).await?;
            if cli.headless {
                cli::daemon::run_daemon(state, coordinator).await?;
            } else {
                run_popup(state).await?;
                coordinator.abort();
            }
        }
    }

    tracing::info!("sabremote stopped");
    Ok(())
}
