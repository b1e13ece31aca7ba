use std::path::PathBuf;

use thiserror::Error;

use crate::{management::QuotaTracker, types::QuotaState};

#[derive(Debug, Error)]
pub enum StateError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("serde error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

/// JSON snapshot of the quota counters, shared between CLI runs and the server.
pub struct QuotaStateFile {
    path: PathBuf,
}

impl QuotaStateFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<data dir>/state/quota.json`
    pub fn default_location() -> Self {
        let mut path = crate::config::data_dir();
        path.push("state/quota.json");
        Self { path }
    }

    pub async fn persist(&self, tracker: &QuotaTracker) -> Result<(), StateError> {
        if let Some(parent) = self.path.parent() {
            async_fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&tracker.snapshot().await)?;
        async_fs::write(&self.path, json).await?;
        Ok(())
    }

    pub async fn load(&self) -> Result<QuotaState, StateError> {
        let json = async_fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&json)?)
    }

    /// Loads the snapshot into `tracker`. Returns false when there is nothing to load.
    pub async fn restore_into(&self, tracker: &QuotaTracker) -> Result<bool, StateError> {
        match self.load().await {
            Ok(state) => {
                tracker.restore(state).await;
                Ok(true)
            }
            Err(StateError::IoError(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn clear(&self) -> Result<(), StateError> {
        async_fs::remove_file(&self.path).await?;
        Ok(())
    }
}
