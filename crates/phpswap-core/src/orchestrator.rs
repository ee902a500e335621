use log::{info, warn};
use std::collections::HashMap;
use tokio::task::{JoinHandle, JoinSet};

use phpswap_backend::{CommandOutput, Formula, PhpVersion, Privilege};
use phpswap_brew::{BrewClient, ServiceAction};

use crate::report::{Step, StepKind, SwitchReport};

/// A one-shot request to make `target` the linked PHP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchIntent {
    pub target: PhpVersion,
    pub available: Vec<PhpVersion>,
}

impl SwitchIntent {
    #[must_use]
    pub fn new(target: PhpVersion, available: Vec<PhpVersion>) -> Self {
        Self { target, available }
    }

    /// `available`, plus the target if the caller left it out.
    fn teardown_versions(&self) -> Vec<PhpVersion> {
        let mut versions = self.available.clone();
        if !versions.contains(&self.target) {
            versions.push(self.target.clone());
        }
        versions
    }
}

/// Unlinks every version concurrently, waits for all of them, then links the
/// target.
///
/// Holds no busy flag of its own; callers must not start a second switch
/// while one is running.
#[derive(Clone)]
pub struct SwitchOrchestrator {
    brew: BrewClient,
    alias: Option<PhpVersion>,
}

impl SwitchOrchestrator {
    #[must_use]
    pub fn new(brew: BrewClient, alias: Option<PhpVersion>) -> Self {
        Self { brew, alias }
    }

    fn formula(&self, version: &PhpVersion) -> Formula {
        Formula::for_version(version, self.alias.as_ref())
    }

    pub async fn switch(&self, intent: SwitchIntent) -> SwitchReport {
        info!("Switching to {}, unlinking all versions...", intent.target);

        let mut tasks = JoinSet::new();
        let mut formulae = HashMap::new();
        for version in intent.teardown_versions() {
            let brew = self.brew.clone();
            let formula = self.formula(&version);
            let task_formula = formula.clone();
            let handle = tasks.spawn(async move { teardown(&brew, task_formula).await });
            formulae.insert(handle.id(), formula);
        }

        let mut steps = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(task_steps) => steps.extend(task_steps),
                Err(e) => {
                    let target = formulae
                        .get(&e.id())
                        .map_or_else(|| "unknown".to_string(), ToString::to_string);
                    warn!("Unlink task for {target} did not finish: {e}");
                    steps.push(Step::new(
                        StepKind::Service(ServiceAction::Stop),
                        target,
                        Privilege::Elevated,
                        CommandOutput::not_run(e.to_string()),
                    ));
                }
            }
        }
        info!("All versions have been unlinked, linking {}", intent.target);

        let activation = self.activate(&intent.target).await;
        info!("The new version has been linked!");

        SwitchReport {
            target: intent.target,
            teardown: steps,
            activation,
        }
    }

    /// Run [`Self::switch`] in the background and hand the report to
    /// `on_complete` once everything has finished.
    pub fn spawn_switch<F>(&self, intent: SwitchIntent, on_complete: F) -> JoinHandle<()>
    where
        F: FnOnce(SwitchReport) + Send + 'static,
    {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            let report = orchestrator.switch(intent).await;
            on_complete(report);
        })
    }

    async fn activate(&self, target: &PhpVersion) -> Vec<Step> {
        let formula = self.formula(target);

        let link = self.brew.link(&formula, true).await;
        let start = self
            .brew
            .service(ServiceAction::Start, formula.as_str(), Privilege::Elevated)
            .await;

        vec![
            Step::new(StepKind::Link, formula.as_str(), Privilege::User, link),
            Step::new(
                StepKind::Service(ServiceAction::Start),
                formula.as_str(),
                Privilege::Elevated,
                start,
            ),
        ]
    }
}

async fn teardown(brew: &BrewClient, formula: Formula) -> Vec<Step> {
    let unlink = brew.unlink(&formula).await;
    let stop = brew
        .service(ServiceAction::Stop, formula.as_str(), Privilege::Elevated)
        .await;

    vec![
        Step::new(StepKind::Unlink, formula.as_str(), Privilege::User, unlink),
        Step::new(
            StepKind::Service(ServiceAction::Stop),
            formula.as_str(),
            Privilege::Elevated,
            stop,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use phpswap_backend::Privilege;

    use super::{SwitchIntent, SwitchOrchestrator};
    use crate::testing::{FakeBrew, brew_client, version, versions};

    fn orchestrator(fake: &Arc<FakeBrew>, alias: Option<&str>) -> SwitchOrchestrator {
        SwitchOrchestrator::new(brew_client(fake), alias.map(version))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn every_teardown_finishes_before_link_starts() {
        let fake = Arc::new(FakeBrew::new().staggered());
        let available = versions(&["7.2", "7.3", "7.4", "8.0", "8.1"]);

        let report = orchestrator(&fake, Some("8.1"))
            .switch(SwitchIntent::new(version("8.0"), available.clone()))
            .await;

        let calls = fake.calls();
        let teardown: Vec<_> = calls
            .iter()
            .filter(|c| c.verb() == "unlink" || c.verb() == "services stop")
            .collect();
        let activation: Vec<_> = calls
            .iter()
            .filter(|c| c.verb() == "link" || c.verb() == "services start")
            .collect();

        assert_eq!(teardown.len(), available.len() * 2);
        assert_eq!(activation.len(), 2);
        let last_teardown = teardown.iter().map(|c| c.finished).max().expect("teardown ran");
        let first_activation = activation
            .iter()
            .map(|c| c.started)
            .min()
            .expect("activation ran");
        assert!(last_teardown < first_activation);
        assert_eq!(report.teardown.len(), available.len() * 2);
    }

    #[tokio::test]
    async fn activation_links_then_starts_with_force() {
        let fake = Arc::new(FakeBrew::new());

        orchestrator(&fake, Some("8.1"))
            .switch(SwitchIntent::new(version("7.4"), versions(&["7.4", "8.1"])))
            .await;

        let calls = fake.calls();
        let link = calls.iter().find(|c| c.verb() == "link").expect("link ran");
        let start = calls
            .iter()
            .find(|c| c.verb() == "services start")
            .expect("start ran");
        assert_eq!(link.invocation.args, ["link", "php@7.4", "--overwrite", "--force"]);
        assert_eq!(link.invocation.privilege, Privilege::User);
        assert_eq!(start.target(), "php@7.4");
        assert_eq!(start.invocation.privilege, Privilege::Elevated);
        assert!(link.finished < start.started);
    }

    #[tokio::test]
    async fn alias_version_is_addressed_as_bare_php() {
        let fake = Arc::new(FakeBrew::new());

        orchestrator(&fake, Some("8.1"))
            .switch(SwitchIntent::new(version("8.1"), versions(&["7.4", "8.1"])))
            .await;

        let calls = fake.calls();
        let mut unlinked: Vec<&str> = calls
            .iter()
            .filter(|c| c.verb() == "unlink")
            .map(|c| c.target())
            .collect();
        unlinked.sort_unstable();
        assert_eq!(unlinked, ["php", "php@7.4"]);
        assert!(calls.iter().any(|c| c.verb() == "link" && c.target() == "php"));
        assert!(calls.iter().all(|c| c.verb() != "services stop"
            || c.invocation.privilege == Privilege::Elevated));
    }

    #[tokio::test]
    async fn switching_twice_reaches_same_end_state() {
        let fake = Arc::new(FakeBrew::new().with_linked("php@7.4"));
        let orchestrator = orchestrator(&fake, None);
        let intent = SwitchIntent::new(version("8.0"), versions(&["7.4", "8.0"]));

        orchestrator.switch(intent.clone()).await;
        let after_once = fake.linked();
        orchestrator.switch(intent).await;

        assert_eq!(after_once.into_iter().collect::<Vec<_>>(), ["php@8.0"]);
        assert_eq!(fake.linked().into_iter().collect::<Vec<_>>(), ["php@8.0"]);
    }

    #[tokio::test]
    async fn target_missing_from_available_is_still_torn_down() {
        let fake = Arc::new(FakeBrew::new());

        let report = orchestrator(&fake, None)
            .switch(SwitchIntent::new(version("8.0"), versions(&["7.4"])))
            .await;

        assert_eq!(report.teardown.len(), 4);
    }

    #[tokio::test]
    async fn failures_are_reported_not_raised() {
        let fake = Arc::new(FakeBrew::new().failing());

        let report = orchestrator(&fake, None)
            .switch(SwitchIntent::new(version("8.0"), versions(&["7.4", "8.0"])))
            .await;

        // two elevated stops, link, start; unlink failures are tolerated
        assert_eq!(report.failures().count(), 4);
        assert!(!report.is_clean());
    }

    #[tokio::test]
    async fn panicked_teardown_is_reported_under_its_formula() {
        let fake = Arc::new(FakeBrew::new().panicking_on_unlink("php@7.4"));

        let report = orchestrator(&fake, None)
            .switch(SwitchIntent::new(version("8.0"), versions(&["7.4", "8.0"])))
            .await;

        let lost: Vec<_> = report
            .teardown
            .iter()
            .filter(|step| step.output.status.is_none())
            .collect();
        assert_eq!(lost.len(), 1);
        assert_eq!(lost[0].target, "php@7.4");
        assert!(report.failures().any(|step| step.target == "php@7.4"));
        assert_eq!(report.activation.len(), 2);
    }

    #[tokio::test]
    async fn completion_callback_fires_after_activation() {
        let fake = Arc::new(FakeBrew::new());
        let (tx, rx) = tokio::sync::oneshot::channel();
        let observed = Arc::clone(&fake);

        let handle = orchestrator(&fake, None).spawn_switch(
            SwitchIntent::new(version("7.4"), versions(&["7.4", "8.0"])),
            move |report| {
                let saw_start = observed.calls().iter().any(|c| c.verb() == "services start");
                let _ = tx.send((report, saw_start));
            },
        );

        let (report, saw_start) = rx.await.expect("callback fired");
        handle.await.expect("switch task finished");
        assert!(saw_start);
        assert_eq!(report.target, version("7.4"));
        assert!(report.is_clean());
    }
}
