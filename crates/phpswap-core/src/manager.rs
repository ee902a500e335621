use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use phpswap_backend::{
    Formula, InstalledVersion, Invocation, LongVersion, PhpVersion, SupportedVersions,
};
use phpswap_brew::{BrewClient, TextTools, ValetClient, resolve_default_version};
use phpswap_platform::PHP_CONFIG_BINARY;

use crate::busy::BusyFlag;
use crate::detector::VersionDetector;
use crate::error::CoreError;
use crate::extensions::{ExtensionToggler, PhpExtension, read_extensions};
use crate::orchestrator::{SwitchIntent, SwitchOrchestrator};
use crate::registry::{RegistrySnapshot, VersionRegistry};
use crate::repair::{RepairAction, RepairReport};
use crate::report::SwitchReport;
use crate::services::Services;
use crate::valet::ValetSwitcher;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchStrategy {
    #[default]
    Internal,
    Valet,
}

/// Owns detection, the registry and the single-flight rule for switch and
/// repair.
pub struct PhpManager {
    brew: BrewClient,
    detector: VersionDetector,
    registry: Arc<VersionRegistry>,
    valet: Option<ValetClient>,
    alias: Option<PhpVersion>,
    busy: BusyFlag,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl PhpManager {
    #[must_use]
    pub fn new(brew: BrewClient, supported: SupportedVersions) -> Self {
        let detector = VersionDetector::new(Arc::clone(brew.invoker()), brew.paths().clone())
            .with_supported(supported);
        Self {
            brew,
            detector,
            registry: Arc::new(VersionRegistry::new()),
            valet: None,
            alias: None,
            busy: BusyFlag::new(),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn with_binary_check(mut self, enabled: bool) -> Self {
        self.detector = self.detector.with_binary_check(enabled);
        self
    }

    #[must_use]
    pub fn with_valet(mut self, valet: Option<ValetClient>) -> Self {
        self.valet = valet;
        self
    }

    /// Ask Homebrew which release plain `php` is. Leaves the alias unset if
    /// it cannot tell.
    pub async fn resolve_alias(&mut self) -> Option<&PhpVersion> {
        match resolve_default_version(&self.brew).await {
            Ok(version) => {
                info!("The default php formula is PHP {version}");
                self.alias = Some(version);
            }
            Err(e) => {
                warn!("Could not determine the default php formula version: {e}");
                self.alias = None;
            }
        }
        self.alias.as_ref()
    }

    #[must_use]
    pub fn brew(&self) -> &BrewClient {
        &self.brew
    }

    #[must_use]
    pub fn alias(&self) -> Option<&PhpVersion> {
        self.alias.as_ref()
    }

    #[must_use]
    pub fn busy(&self) -> &BusyFlag {
        &self.busy
    }

    #[must_use]
    pub fn has_valet(&self) -> bool {
        self.valet.is_some()
    }

    #[must_use]
    pub fn snapshot(&self) -> Arc<RegistrySnapshot> {
        self.registry.snapshot()
    }

    /// Detect again and rebuild the registry. Concurrent calls run one after
    /// the other.
    pub async fn refresh(&self) -> Arc<RegistrySnapshot> {
        let _guard = self.refresh_lock.lock().await;
        let versions = self.detector.detect(self.alias.as_ref());
        self.registry
            .rebuild(versions, self.alias.clone(), &self.brew)
            .await
    }

    async fn snapshot_or_refresh(&self) -> Arc<RegistrySnapshot> {
        let snapshot = self.registry.snapshot();
        if snapshot.generation() == 0 {
            return self.refresh().await;
        }
        snapshot
    }

    #[must_use]
    pub fn describe(&self) -> Vec<InstalledVersion> {
        self.detector
            .describe(self.snapshot().versions(), self.alias.as_ref())
    }

    /// The long version of whatever is linked into `<prefix>/bin` right now.
    ///
    /// # Errors
    /// Returns an error if nothing is linked or the output is not a version.
    pub async fn current_version(&self) -> Result<LongVersion, CoreError> {
        let invocation = Invocation::new(
            self.brew.paths().linked_binary(PHP_CONFIG_BINARY),
            ["--version"],
        );
        let stdout = self
            .brew
            .invoker()
            .run(&invocation)
            .await
            .into_result(&invocation)?;
        LongVersion::parse(&stdout).map_err(|e| CoreError::Backend(e.into()))
    }

    /// The formula that provides the linked PHP.
    ///
    /// # Errors
    /// See [`Self::current_version`].
    pub async fn active_formula(&self) -> Result<Formula, CoreError> {
        let current = self.current_version().await?;
        let version = current.short().ok_or_else(|| CoreError::NotInstalled {
            version: current.raw.clone(),
        })?;
        Ok(Formula::for_version(&version, self.alias.as_ref()))
    }

    /// Make `target` the linked PHP, then refresh the registry.
    ///
    /// # Errors
    /// Returns [`CoreError::Busy`] while another switch or repair runs, and
    /// [`CoreError::NotInstalled`] for versions detection did not find.
    /// Command failures are not errors; they are in the report.
    pub async fn switch_to(
        &self,
        target: PhpVersion,
        strategy: SwitchStrategy,
    ) -> Result<SwitchReport, CoreError> {
        if strategy == SwitchStrategy::Valet && self.valet.is_none() {
            return Err(CoreError::ValetUnavailable);
        }
        let guard = self.busy.try_acquire().ok_or(CoreError::Busy)?;

        let snapshot = self.snapshot_or_refresh().await;
        if !snapshot.contains(&target) {
            return Err(CoreError::NotInstalled {
                version: target.to_string(),
            });
        }

        let report = match (strategy, &self.valet) {
            (SwitchStrategy::Valet, Some(valet)) => {
                let report = ValetSwitcher::new(valet.clone()).switch(target).await;
                drop(guard);
                report
            }
            _ => {
                let version = target.to_string();
                let intent = SwitchIntent::new(target, snapshot.versions().to_vec());
                let (tx, rx) = tokio::sync::oneshot::channel();
                let handle = SwitchOrchestrator::new(self.brew.clone(), self.alias.clone())
                    .spawn_switch(intent, move |report| {
                        drop(guard);
                        let _ = tx.send(report);
                    });
                let report = rx.await;
                if let Err(e) = handle.await {
                    warn!("Switch task for {version} did not finish: {e}");
                }
                report.map_err(|_| CoreError::SwitchAborted { version })?
            }
        };

        self.refresh().await;
        Ok(report)
    }

    /// Run [`RepairAction`] over everything detected.
    ///
    /// # Errors
    /// Returns [`CoreError::Busy`] while a switch or another repair runs.
    pub async fn repair(&self) -> Result<RepairReport, CoreError> {
        let guard = self.busy.try_acquire().ok_or(CoreError::Busy)?;

        let snapshot = self.refresh().await;
        let report = RepairAction::new(self.brew.clone(), self.alias.clone())
            .run(snapshot.versions())
            .await;
        drop(guard);

        self.refresh().await;
        Ok(report)
    }

    #[must_use]
    pub fn services(&self) -> Services {
        Services::new(self.brew.clone())
    }

    #[must_use]
    pub fn ini_path(&self, version: &PhpVersion) -> PathBuf {
        self.brew.paths().php_ini(version.as_str())
    }

    /// # Errors
    /// Returns [`CoreError::IniNotFound`] if the version has no php.ini.
    pub fn extensions(&self, version: &PhpVersion) -> Result<Vec<PhpExtension>, CoreError> {
        read_extensions(&self.ini_path(version))
    }

    /// Comment or uncomment the directive for `name` in the version's php.ini.
    /// Returns whether the file changed.
    ///
    /// # Errors
    /// Returns an error if the ini or the extension is missing, or sed fails.
    pub async fn set_extension(
        &self,
        version: &PhpVersion,
        name: &str,
        enabled: bool,
    ) -> Result<bool, CoreError> {
        let extension = self
            .extensions(version)?
            .into_iter()
            .find(|extension| extension.name == name)
            .ok_or_else(|| CoreError::ExtensionNotFound {
                name: name.to_string(),
            })?;

        let text = TextTools::new(Arc::clone(self.brew.invoker()), self.brew.paths().clone());
        ExtensionToggler::new(text)
            .set_enabled(&self.ini_path(version), &extension, enabled)
            .await
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use phpswap_backend::{Privilege, SupportedVersions};
    use phpswap_brew::{BrewClient, ValetClient};
    use phpswap_platform::BrewPaths;
    use tempfile::TempDir;

    use super::{PhpManager, SwitchStrategy};
    use crate::error::CoreError;
    use crate::testing::{FakeBrew, version, versions};

    fn prefix(formulae: &[&str]) -> TempDir {
        let root = tempfile::tempdir().expect("create prefix");
        for formula in formulae {
            std::fs::create_dir_all(root.path().join("opt").join(formula))
                .expect("create formula dir");
        }
        root
    }

    fn manager(fake: &Arc<FakeBrew>, root: &TempDir) -> PhpManager {
        let brew = BrewClient::new(fake.clone(), BrewPaths::new(root.path()));
        PhpManager::new(brew, SupportedVersions::default()).with_binary_check(false)
    }

    #[tokio::test]
    async fn refresh_detects_and_bumps_generation() {
        let fake = Arc::new(FakeBrew::new().with_long_version("php@8.0", "8.0.30"));
        let root = prefix(&["php@7.4", "php@8.0", "nginx"]);
        let manager = manager(&fake, &root);

        let snapshot = manager.refresh().await;

        assert_eq!(snapshot.versions(), versions(&["7.4", "8.0"]).as_slice());
        assert_eq!(snapshot.generation(), 1);
        assert_eq!(manager.refresh().await.generation(), 2);
    }

    #[tokio::test]
    async fn switch_to_unknown_version_runs_nothing() {
        let fake = Arc::new(FakeBrew::new());
        let root = prefix(&["php@7.4"]);
        let manager = manager(&fake, &root);

        let result = manager
            .switch_to(version("8.3"), SwitchStrategy::Internal)
            .await;

        assert!(matches!(result, Err(CoreError::NotInstalled { .. })));
        assert!(fake.calls().iter().all(|c| c.verb() == "--version"));
        assert!(!manager.busy().is_busy());
    }

    #[tokio::test]
    async fn switch_is_refused_while_busy() {
        let fake = Arc::new(FakeBrew::new());
        let root = prefix(&["php@7.4", "php@8.0"]);
        let manager = manager(&fake, &root);
        let _held = manager.busy().try_acquire().expect("flag free");

        let switch = manager
            .switch_to(version("8.0"), SwitchStrategy::Internal)
            .await;
        let repair = manager.repair().await;

        assert_eq!(switch.err(), Some(CoreError::Busy));
        assert_eq!(repair.err(), Some(CoreError::Busy));
        assert!(fake.calls().is_empty());
    }

    #[tokio::test]
    async fn internal_switch_links_target_and_releases_flag() {
        let fake = Arc::new(FakeBrew::new().with_linked("php@7.4"));
        let root = prefix(&["php@7.4", "php@8.0"]);
        let manager = manager(&fake, &root);
        manager.refresh().await;

        let report = manager
            .switch_to(version("8.0"), SwitchStrategy::Internal)
            .await
            .expect("switch accepted");

        assert!(report.is_clean());
        assert_eq!(fake.linked().into_iter().collect::<Vec<_>>(), ["php@8.0"]);
        assert!(!manager.busy().is_busy());
        assert_eq!(manager.snapshot().generation(), 2);
    }

    #[tokio::test]
    async fn valet_strategy_requires_valet() {
        let fake = Arc::new(FakeBrew::new());
        let root = prefix(&["php@8.0"]);
        let manager = manager(&fake, &root);

        let result = manager.switch_to(version("8.0"), SwitchStrategy::Valet).await;

        assert_eq!(result.err(), Some(CoreError::ValetUnavailable));
    }

    #[tokio::test]
    async fn valet_strategy_uses_valet_only() {
        let fake = Arc::new(FakeBrew::new());
        let root = prefix(&["php@8.0"]);
        let manager = manager(&fake, &root).with_valet(Some(ValetClient::new(
            fake.clone(),
            PathBuf::from("/usr/local/bin/valet"),
        )));

        let report = manager
            .switch_to(version("8.0"), SwitchStrategy::Valet)
            .await
            .expect("switch accepted");

        assert!(report.teardown.is_empty());
        let calls = fake.calls();
        let valet: Vec<_> = calls.iter().filter(|c| c.verb() == "use").collect();
        assert_eq!(valet.len(), 1);
        assert_eq!(valet[0].invocation.privilege, Privilege::Elevated);
        assert!(calls.iter().all(|c| c.verb() != "link" && c.verb() != "unlink"));
    }

    #[tokio::test]
    async fn repair_covers_every_detected_version() {
        let fake = Arc::new(FakeBrew::new());
        let root = prefix(&["php@7.4", "php@8.0"]);
        let manager = manager(&fake, &root);

        let report = manager.repair().await.expect("repair accepted");

        assert_eq!(report.steps.len(), 1 + 2 * 3 + 6);
        assert!(!manager.busy().is_busy());
    }

    #[tokio::test]
    async fn unknown_extension_is_reported() {
        let fake = Arc::new(FakeBrew::new());
        let root = prefix(&["php@8.0"]);
        let ini_dir = root.path().join("etc/php/8.0");
        std::fs::create_dir_all(&ini_dir).expect("create ini dir");
        std::fs::write(ini_dir.join("php.ini"), "extension=\"redis.so\"\n").expect("write ini");
        let manager = manager(&fake, &root);

        let listed = manager.extensions(&version("8.0")).expect("ini readable");
        let toggled = manager
            .set_extension(&version("8.0"), "xdebug", true)
            .await;

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "redis");
        assert_eq!(
            toggled.err(),
            Some(CoreError::ExtensionNotFound {
                name: "xdebug".to_string()
            })
        );
    }
}
