use std::io::ErrorKind;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Result};
use tokio::fs;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tracing::{debug, error, info, warn};

use crate::cache::token::Token;
use crate::config::sinks::{FileSinkConfig, SinkMessage};
use crate::observability::metrics::Metrics;

static FILE_MSG: &str = "file";
static ERROR_MSG: &str = "error";

/// Writes the current token to a file, atomically (temp file + rename).
#[derive(Clone)]
pub struct FileSink {
    path: PathBuf,
    metrics: Arc<Metrics>,
}

impl FileSink {
    pub fn new(cfg: &FileSinkConfig, metrics: Arc<Metrics>) -> Self {
        Self {
            path: PathBuf::from(&cfg.path),
            metrics,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn write(&self, token: &Token) -> Result<()> {
        let tmp_path = self.tmp_path()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }

        fs::write(&tmp_path, token.value.as_bytes()).await?;
        fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600)).await?;
        fs::rename(&tmp_path, &self.path).await.inspect_err(|_| {
            let _ = std::fs::remove_file(&tmp_path);
        })?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path).await {
            Ok(_) => {
                info!("Deleted file: {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("File not found, nothing to delete: {}", self.path.display());
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Propagates sink messages until the sender side is dropped.
    pub async fn run(self, mut rx: Receiver<SinkMessage>) -> Result<()> {
        info!("start sink 'type: file', path '{}'", self.path.display());
        let mut last_exp: Option<u64> = None;
        loop {
            let message = match rx.recv().await {
                Ok(message) => message,
                Err(RecvError::Lagged(skipped)) => {
                    warn!("sink file: skipped {} messages", skipped);
                    continue;
                }
                Err(RecvError::Closed) => return Ok(()),
            };

            let result = match message {
                SinkMessage::Updated(token) => {
                    // skip storing if token with the same exp is already written
                    if last_exp == Some(token.exp_unix_ts) {
                        continue;
                    }
                    info!("token writes, path '{}'", self.path.display());
                    self.write(&token).await.map(|_| last_exp = Some(token.exp_unix_ts))
                }
                SinkMessage::Cleared => {
                    last_exp = None;
                    self.clear().await
                }
            };

            match result {
                Ok(_) => self.metrics.sink_propagations.with_label_values(&[FILE_MSG]).inc(),
                Err(err) => {
                    error!("sink file: {}", err);
                    self.metrics.sink_failures.with_label_values(&[FILE_MSG, ERROR_MSG]).inc();
                }
            }
        }
    }

    fn tmp_path(&self) -> Result<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| anyhow!("sink file path '{}' has no file name", self.path.display()))?;
        let mut tmp_name = std::ffi::OsString::from(".");
        tmp_name.push(file_name);
        tmp_name.push(".tmp");
        Ok(self.path.with_file_name(tmp_name))
    }
}
