use std::sync::Arc;

use anyhow::Result;
use tokio::sync::broadcast::Receiver;
use tracing::{error, info};

use crate::config::sinks::{SinkMessage, SinksConfig};
use crate::observability::metrics::Metrics;
use crate::sinks::file_sink::FileSink;

/// Active sinks, fed by the refresh agent through the sink channel.
/// The HTTP sink is passive and lives in the server.
#[derive(Clone)]
pub struct SinkManager {
    file: Option<FileSink>,
}

impl SinkManager {
    pub fn new(sinks: &SinksConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            file: sinks.file.as_ref().map(|cfg| FileSink::new(cfg, metrics)),
        }
    }

    /// Start all propagation backends
    pub async fn start_active_sinks(&self, sink_receiver: Receiver<SinkMessage>) -> Result<()> {
        match &self.file {
            Some(file) => file.clone().run(sink_receiver).await,
            None => {
                info!("no active sinks configured");
                Ok(())
            }
        }
    }

    /// Removes propagated tokens, called on shutdown.
    pub async fn cleanup(&self) {
        if let Some(file) = &self.file {
            info!("remove token file at path: {}", file.path().display());
            if let Err(err) = file.clear().await {
                error!("failed to delete {}: {}", file.path().display(), err);
            }
        }
    }
}
