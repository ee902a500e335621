use std::path::{Path, PathBuf};

/// Executable name inside a formula's `bin/` directory.
pub const PHP_BINARY: &str = "php";
pub const PHP_CONFIG_BINARY: &str = "php-config";

/// Filesystem layout of one Homebrew installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrewPaths {
    prefix: PathBuf,
}

impl BrewPaths {
    #[must_use]
    pub fn new(prefix: impl Into<PathBuf>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Locate the Homebrew prefix.
    ///
    /// An explicit override wins, then `HOMEBREW_PREFIX`, then the first
    /// well-known prefix that exists. Falls back to `/usr/local`.
    #[must_use]
    pub fn detect(override_prefix: Option<&Path>) -> Self {
        let env_prefix = std::env::var_os("HOMEBREW_PREFIX").map(PathBuf::from);
        let prefix = select_prefix(
            override_prefix.map(Path::to_path_buf),
            env_prefix,
            default_prefix_candidates(),
        );
        log::debug!("Using Homebrew prefix {}", prefix.display());
        Self { prefix }
    }

    #[must_use]
    pub fn prefix(&self) -> &Path {
        &self.prefix
    }

    /// `<prefix>/opt`, where every installed formula has a stable symlink.
    #[must_use]
    pub fn opt_path(&self) -> PathBuf {
        self.prefix.join("opt")
    }

    /// `<prefix>/bin`, where linked formulae expose their executables.
    #[must_use]
    pub fn bin_path(&self) -> PathBuf {
        self.prefix.join("bin")
    }

    #[must_use]
    pub fn etc_path(&self) -> PathBuf {
        self.prefix.join("etc")
    }

    #[must_use]
    pub fn brew_binary(&self) -> PathBuf {
        self.bin_path().join("brew")
    }

    /// `<prefix>/opt/<formula>/bin/<binary>`.
    #[must_use]
    pub fn formula_binary(&self, formula: &str, binary: &str) -> PathBuf {
        self.opt_path().join(formula).join("bin").join(binary)
    }

    /// The `php` executable that is currently linked, if any.
    #[must_use]
    pub fn linked_binary(&self, binary: &str) -> PathBuf {
        self.bin_path().join(binary)
    }

    #[must_use]
    pub fn php_config_dir(&self) -> PathBuf {
        self.etc_path().join("php")
    }

    #[must_use]
    pub fn php_ini(&self, version: &str) -> PathBuf {
        self.php_config_dir().join(version).join("php.ini")
    }

    /// GNU sed, installed by the `gnu-sed` formula.
    #[must_use]
    pub fn gsed_binary(&self) -> PathBuf {
        self.bin_path().join("gsed")
    }
}

fn select_prefix(
    override_prefix: Option<PathBuf>,
    env_prefix: Option<PathBuf>,
    candidates: Vec<PathBuf>,
) -> PathBuf {
    if let Some(prefix) = override_prefix {
        return prefix;
    }

    if let Some(prefix) = env_prefix.filter(|path| path.exists()) {
        return prefix;
    }

    candidates
        .into_iter()
        .find(|candidate| candidate.join("bin").join("brew").exists())
        .unwrap_or_else(|| PathBuf::from("/usr/local"))
}

fn default_prefix_candidates() -> Vec<PathBuf> {
    vec![
        PathBuf::from("/opt/homebrew"),
        PathBuf::from("/usr/local"),
        PathBuf::from("/home/linuxbrew/.linuxbrew"),
    ]
}
