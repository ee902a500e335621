use std::path::PathBuf;
use thiserror::Error;

use phpswap_backend::BackendError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("A switch or repair is already in progress")]
    Busy,

    #[error("PHP {version} is not installed")]
    NotInstalled { version: String },

    #[error("Laravel Valet is not installed")]
    ValetUnavailable,

    #[error("No php.ini found at {}", path.display())]
    IniNotFound { path: PathBuf },

    #[error("Extension {name} is not configured in php.ini")]
    ExtensionNotFound { name: String },

    #[error("Switch to {version} stopped before it finished")]
    SwitchAborted { version: String },

    #[error(transparent)]
    Backend(#[from] BackendError),
}
