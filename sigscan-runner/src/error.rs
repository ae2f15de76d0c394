//! Scan-level error taxonomy.

use sigscan_core::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Debug, Error)]
pub enum ScanError {
    /// The store could not be read and no previous result is held.
    #[error("scan unavailable: {0}")]
    Unavailable(String),

    #[error("a scan is already in progress")]
    InProgress,

    #[error("scan cancelled")]
    Cancelled,

    #[error("failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<StoreError> for ScanError {
    fn from(err: StoreError) -> Self {
        ScanError::Unavailable(err.to_string())
    }
}
