mod alias;
mod client;
mod detection;
mod shell;
mod text;
mod valet;

pub use alias::{parse_brew_info, resolve_default_version};
pub use client::{BrewClient, ServiceAction};
pub use detection::{BrewDetection, detect_brew, detect_valet};
pub use shell::ShellInvoker;
pub use text::TextTools;
pub use valet::ValetClient;
