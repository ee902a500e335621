mod error;
mod invoker;
mod types;

pub use error::BackendError;
pub use invoker::{CommandOutput, HistoryItem, Invocation, Privilege, ProcessInvoker};
pub use types::{
    DEFAULT_FORMULA, Formula, InstalledVersion, LongVersion, PhpInstallation, PhpVersion,
    SupportedVersions, VERSIONED_FORMULA_PREFIX, VersionParseError,
};
