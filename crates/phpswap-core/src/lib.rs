//! Detection of installed PHP versions and switching between them.
//!
//! The pieces fit together as follows: [`VersionDetector`] finds what is
//! installed, [`VersionRegistry`] caches what each installation reports about
//! itself, [`SwitchOrchestrator`] performs the unlink/link sequence and
//! [`RepairAction`] is the blunt recovery path. [`PhpManager`] wires them up
//! and enforces that only one switch runs at a time.

mod busy;
mod detector;
mod error;
mod extensions;
mod manager;
mod orchestrator;
mod registry;
mod repair;
mod report;
mod services;
mod valet;

#[cfg(test)]
mod testing;

pub use busy::{BusyFlag, BusyGuard};
pub use detector::{VersionDetector, extract_versions};
pub use error::CoreError;
pub use extensions::{
    ExtensionKind, ExtensionToggler, PhpExtension, parse_extensions, read_extensions,
};
pub use manager::{PhpManager, SwitchStrategy};
pub use orchestrator::{SwitchIntent, SwitchOrchestrator};
pub use registry::{RegistrySnapshot, VersionRegistry};
pub use repair::{RepairAction, RepairReport};
pub use report::{Step, StepKind, SwitchReport};
pub use services::Services;
pub use valet::ValetSwitcher;
