use anyhow::Result;
use tokio::select;
use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

/// Resolves on SIGINT or SIGTERM.
pub async fn wait_for_signal() -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;
    select! {
        _ = sigint.recv() => {
            info!("Received SIGINT (Ctrl+C). Initiating graceful shutdown...");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM. Initiating graceful shutdown...");
        }
    }
    Ok(())
}
