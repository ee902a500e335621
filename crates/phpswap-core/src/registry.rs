use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use phpswap_backend::{Formula, LongVersion, PhpInstallation, PhpVersion};
use phpswap_brew::BrewClient;
use phpswap_platform::PHP_CONFIG_BINARY;

/// Immutable view of everything the last detection pass found.
#[derive(Debug, Clone, Default)]
pub struct RegistrySnapshot {
    versions: Vec<PhpVersion>,
    installations: HashMap<PhpVersion, PhpInstallation>,
    alias: Option<PhpVersion>,
    generation: u64,
    built_at: Option<chrono::DateTime<chrono::Local>>,
}

impl RegistrySnapshot {
    /// Detected versions in detection order.
    #[must_use]
    pub fn versions(&self) -> &[PhpVersion] {
        &self.versions
    }

    #[must_use]
    pub fn get(&self, version: &PhpVersion) -> Option<&PhpInstallation> {
        self.installations.get(version)
    }

    #[must_use]
    pub fn contains(&self, version: &PhpVersion) -> bool {
        self.installations.contains_key(version)
    }

    #[must_use]
    pub fn alias(&self) -> Option<&PhpVersion> {
        self.alias.as_ref()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Increments on every rebuild; 0 means never built.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    #[must_use]
    pub fn built_at(&self) -> Option<chrono::DateTime<chrono::Local>> {
        self.built_at
    }

    /// Installations in detection order.
    pub fn installations(&self) -> impl Iterator<Item = &PhpInstallation> {
        self.versions
            .iter()
            .filter_map(|version| self.installations.get(version))
    }
}

/// Process-wide cache of installed versions and their long version strings.
///
/// Each rebuild produces a new [`RegistrySnapshot`] and swaps it in whole, so
/// readers see either the previous snapshot or the new one.
#[derive(Debug, Default)]
pub struct VersionRegistry {
    current: RwLock<Arc<RegistrySnapshot>>,
}

impl VersionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        Arc::clone(
            &self
                .current
                .read()
                .unwrap_or_else(std::sync::PoisonError::into_inner),
        )
    }

    #[must_use]
    pub fn get(&self, version: &PhpVersion) -> Option<PhpInstallation> {
        self.snapshot().get(version).cloned()
    }

    /// Query every version's binary and replace the current snapshot.
    ///
    /// Entries for versions no longer in `versions` are dropped.
    pub async fn rebuild(
        &self,
        versions: Vec<PhpVersion>,
        alias: Option<PhpVersion>,
        brew: &BrewClient,
    ) -> Arc<RegistrySnapshot> {
        let mut installations = HashMap::with_capacity(versions.len());

        for version in &versions {
            let formula = Formula::for_version(version, alias.as_ref());
            let long_version = query_long_version(brew, &formula).await;
            installations.insert(
                version.clone(),
                PhpInstallation {
                    version: version.clone(),
                    formula,
                    long_version,
                },
            );
        }

        let mut current = self
            .current
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        let snapshot = Arc::new(RegistrySnapshot {
            versions,
            installations,
            alias,
            generation: current.generation + 1,
            built_at: Some(chrono::Local::now()),
        });
        *current = Arc::clone(&snapshot);
        debug!(
            "Version registry rebuilt (generation {}, {} entries)",
            snapshot.generation,
            snapshot.installations.len()
        );
        snapshot
    }
}

async fn query_long_version(brew: &BrewClient, formula: &Formula) -> Option<LongVersion> {
    let output = brew
        .run_formula_binary(formula, PHP_CONFIG_BINARY, &["--version"])
        .await;
    if !output.is_success() {
        warn!("Could not read the version of {formula}: {}", output.stderr.trim());
        return None;
    }

    match LongVersion::parse(&output.stdout) {
        Ok(long) => Some(long),
        Err(e) => {
            warn!("Unexpected php-config output for {formula}: {e}");
            None
        }
    }
}
