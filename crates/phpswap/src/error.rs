use std::path::PathBuf;
use thiserror::Error;

use phpswap_core::CoreError;
use phpswap_platform::AppPathsError;

use crate::switch_lock::LockError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Homebrew was not found (looked for {})", .0.display())]
    BrewNotFound(PathBuf),

    #[error("No PHP version is linked")]
    NoActiveVersion,

    #[error("Could not open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} failed: {source}")]
    Io {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Paths(#[from] AppPathsError),
}

impl AppError {
    pub fn io(operation: &'static str, source: std::io::Error) -> Self {
        Self::Io { operation, source }
    }
}
