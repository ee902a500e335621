mod homebrew;
mod paths;
mod process;

pub use homebrew::{BrewPaths, PHP_BINARY, PHP_CONFIG_BINARY};
pub use paths::{AppPaths, AppPathsError};
pub use process::build_command;
