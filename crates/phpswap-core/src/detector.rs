use log::{debug, info, warn};
use std::path::Path;
use std::sync::Arc;

use phpswap_backend::{
    Formula, InstalledVersion, PhpVersion, ProcessInvoker, SupportedVersions,
    VERSIONED_FORMULA_PREFIX,
};
use phpswap_platform::{BrewPaths, PHP_BINARY};

/// Filter raw `<opt>` directory names down to supported PHP versions.
///
/// Only names that *start* with `php@` qualify, so `something-php@8.0` is
/// ignored. Duplicates, releases outside `supported`, and (through
/// `binary_exists`) installs without a `php` executable are dropped. Input
/// order is preserved.
pub fn extract_versions<I, S, F>(
    lines: I,
    supported: &SupportedVersions,
    binary_exists: F,
) -> Vec<PhpVersion>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
    F: Fn(&PhpVersion) -> bool,
{
    let mut output: Vec<PhpVersion> = Vec::new();

    for line in lines {
        let Some(suffix) = line.as_ref().trim().strip_prefix(VERSIONED_FORMULA_PREFIX) else {
            continue;
        };
        let Ok(version) = suffix.parse::<PhpVersion>() else {
            continue;
        };

        if !output.contains(&version) && supported.contains(&version) && binary_exists(&version) {
            output.push(version);
        }
    }

    output
}

/// Finds which PHP versions Homebrew has installed.
#[derive(Clone)]
pub struct VersionDetector {
    invoker: Arc<dyn ProcessInvoker>,
    paths: BrewPaths,
    supported: SupportedVersions,
    check_binaries: bool,
}

impl VersionDetector {
    #[must_use]
    pub fn new(invoker: Arc<dyn ProcessInvoker>, paths: BrewPaths) -> Self {
        Self {
            invoker,
            paths,
            supported: SupportedVersions::default(),
            check_binaries: true,
        }
    }

    #[must_use]
    pub fn with_supported(mut self, supported: SupportedVersions) -> Self {
        self.supported = supported;
        self
    }

    /// Skip the `bin/php` existence check for suffixed formulae.
    #[must_use]
    pub fn with_binary_check(mut self, enabled: bool) -> Self {
        self.check_binaries = enabled;
        self
    }

    #[must_use]
    pub fn supported(&self) -> &SupportedVersions {
        &self.supported
    }

    /// [`extract_versions`] with this detector's allowlist and binary check.
    pub fn extract_versions<I, S>(&self, lines: I) -> Vec<PhpVersion>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        extract_versions(lines, &self.supported, |version| {
            !self.check_binaries || self.binary_exists(&Formula::versioned(version))
        })
    }

    /// Installed versions in directory-listing order, with the aliased
    /// default appended once if it is installed only as plain `php`.
    ///
    /// Never fails; an empty list means nothing usable is installed.
    pub fn detect(&self, alias: Option<&PhpVersion>) -> Vec<PhpVersion> {
        let listing = list_formula_dirs(&self.paths.opt_path());
        let mut versions = self.extract_versions(&listing);

        if let Some(alias) = alias
            && !versions.contains(alias)
            && self.binary_exists(&Formula::default_php())
        {
            debug!("Adding aliased default php formula as {alias}");
            versions.push(alias.clone());
        }

        info!(
            "The PHP versions that were detected are: {}",
            versions
                .iter()
                .map(PhpVersion::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
        versions
    }

    /// Describe each detected version the way the package manager sees it.
    #[must_use]
    pub fn describe(
        &self,
        versions: &[PhpVersion],
        alias: Option<&PhpVersion>,
    ) -> Vec<InstalledVersion> {
        versions
            .iter()
            .map(|version| {
                let formula = Formula::for_version(version, alias);
                let has_binary = self.binary_exists(&formula);
                InstalledVersion {
                    version: version.clone(),
                    formula,
                    has_binary,
                }
            })
            .collect()
    }

    fn binary_exists(&self, formula: &Formula) -> bool {
        self.invoker
            .file_exists(&self.paths.formula_binary(formula.as_str(), PHP_BINARY))
    }
}

/// Names under `<opt>` that mention `php@`, sorted like `ls` would print them.
fn list_formula_dirs(opt_path: &Path) -> Vec<String> {
    let entries = match std::fs::read_dir(opt_path) {
        Ok(entries) => entries,
        Err(e) => {
            warn!("Could not list {}: {e}", opt_path.display());
            return Vec::new();
        }
    };

    let mut names: Vec<String> = entries
        .filter_map(Result::ok)
        .filter_map(|entry| entry.file_name().into_string().ok())
        .filter(|name| name.contains(VERSIONED_FORMULA_PREFIX))
        .collect();
    names.sort();
    names
}
