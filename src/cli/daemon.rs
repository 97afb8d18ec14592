use crate::app::state::AppState;
use anyhow::Result;
use tokio::signal;
use tokio::task::JoinHandle;

/// Run the coordinator with its polling timer until Ctrl+C
pub async fn run_daemon(state: AppState, coordinator: JoinHandle<()>) -> Result<()> {
    tracing::info!("Starting headless mode...");
    tracing::info!("Press Ctrl+C to stop");

    state.ensure_ready().await?;
    let refresh_rate = state.config.read().await.general.refresh_rate;
    tracing::info!("Polling the queue every {}s", refresh_rate);

    // Wait for Ctrl+C
    match signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C, shutting down...");
        }
        Err(e) => {
            tracing::error!("Error waiting for Ctrl+C: {}", e);
        }
    }

    coordinator.abort();

    tracing::info!("Headless mode stopped");
    Ok(())
}
