use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] siteline_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error(
        "Sync is not configured. Set SITELINE_BASE_URL and SITELINE_ACCOUNT_ID to enable server commands."
    )]
    NotConfigured,
}
