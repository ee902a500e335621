use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use phpswap_backend::SupportedVersions;
use phpswap_core::SwitchStrategy;
use phpswap_platform::AppPaths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Overrides `HOMEBREW_PREFIX` and the well-known prefixes.
    #[serde(default)]
    pub homebrew_prefix: Option<PathBuf>,

    #[serde(default = "default_supported_versions")]
    pub supported_versions: Vec<String>,

    #[serde(default = "default_true")]
    pub check_binaries: bool,

    #[serde(default)]
    pub switcher: SwitchStrategy,

    #[serde(default = "default_true")]
    pub auto_restart_after_extension_toggle: bool,

    #[serde(default)]
    pub debug_logging: bool,

    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    #[serde(default = "default_max_log_size_bytes")]
    pub max_log_size_bytes: u64,

    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
}

fn default_true() -> bool {
    true
}

fn default_supported_versions() -> Vec<String> {
    SupportedVersions::default()
        .iter()
        .map(ToString::to_string)
        .collect()
}

fn default_command_timeout() -> u64 {
    120
}

fn default_max_log_size_bytes() -> u64 {
    5 * 1024 * 1024
}

fn default_history_limit() -> usize {
    200
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            homebrew_prefix: None,
            supported_versions: default_supported_versions(),
            check_binaries: true,
            switcher: SwitchStrategy::default(),
            auto_restart_after_extension_toggle: true,
            debug_logging: false,
            command_timeout_secs: default_command_timeout(),
            max_log_size_bytes: default_max_log_size_bytes(),
            history_limit: default_history_limit(),
        }
    }
}

impl AppSettings {
    pub fn load(paths: &AppPaths) -> (Self, Option<String>) {
        Self::load_from(&paths.settings_file())
    }

    /// Missing, unreadable or malformed files give the defaults. Settings are
    /// read before logging is set up, so a problem worth reporting is handed
    /// back for the caller to log.
    pub fn load_from(path: &Path) -> (Self, Option<String>) {
        if !path.exists() {
            return (Self::default(), None);
        }

        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|content| serde_json::from_str(&content).map_err(|e| e.to_string()));
        match parsed {
            Ok(settings) => (settings, None),
            Err(e) => (
                Self::default(),
                Some(format!("Ignoring settings in {}: {e}", path.display())),
            ),
        }
    }

    pub fn save(&self, paths: &AppPaths) -> Result<(), std::io::Error> {
        paths.ensure_dirs()?;
        self.save_to(&paths.settings_file())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), std::io::Error> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Entries that are not `major.minor` are skipped.
    pub fn supported(&self) -> SupportedVersions {
        SupportedVersions::from_strs(&self.supported_versions)
    }
}
