use log::info;

use phpswap_backend::{Formula, PhpVersion, Privilege};
use phpswap_brew::{BrewClient, ServiceAction};

use crate::report::{Step, StepKind};

const DNSMASQ: &str = "dnsmasq";
const NGINX: &str = "nginx";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub steps: Vec<Step>,
}

impl RepairReport {
    pub fn failures(&self) -> impl Iterator<Item = &Step> {
        self.steps.iter().filter(|step| step.is_failure())
    }
}

/// Brute-force reset for when a switch left things half done.
///
/// Runs a fixed sequence one command at a time and never stops early. Several
/// commands overlap on purpose: the previous run may have left a service owned
/// by either the user or root, and a version may be linked under either its
/// bare or suffixed formula name.
pub struct RepairAction {
    brew: BrewClient,
    alias: Option<PhpVersion>,
    steps: Vec<Step>,
}

impl RepairAction {
    #[must_use]
    pub fn new(brew: BrewClient, alias: Option<PhpVersion>) -> Self {
        Self {
            brew,
            alias,
            steps: Vec::new(),
        }
    }

    /// Unlink and stop everything in `versions`, then put the default `php`,
    /// nginx and dnsmasq back into a known state.
    pub async fn run(mut self, versions: &[PhpVersion]) -> RepairReport {
        info!("Repairing PHP setup for {} detected versions", versions.len());

        self.service(ServiceAction::Restart, DNSMASQ, Privilege::Elevated).await;

        for version in versions {
            let formula = Formula::for_version(version, self.alias.as_ref());
            self.unlink(&Formula::versioned(version)).await;
            self.service(ServiceAction::Stop, formula.as_str(), Privilege::User).await;
            self.service(ServiceAction::Stop, formula.as_str(), Privilege::Elevated).await;
        }

        let php = Formula::default_php();
        self.service(ServiceAction::Stop, php.as_str(), Privilege::User).await;
        self.service(ServiceAction::Stop, NGINX, Privilege::User).await;
        self.link(&php).await;
        self.service(ServiceAction::Restart, DNSMASQ, Privilege::Elevated).await;
        self.service(ServiceAction::Stop, php.as_str(), Privilege::Elevated).await;
        self.service(ServiceAction::Stop, NGINX, Privilege::Elevated).await;

        info!("Repair finished with {} commands", self.steps.len());
        RepairReport { steps: self.steps }
    }

    async fn service(&mut self, action: ServiceAction, name: &str, privilege: Privilege) {
        let output = self.brew.service(action, name, privilege).await;
        self.steps
            .push(Step::new(StepKind::Service(action), name, privilege, output));
    }

    async fn unlink(&mut self, formula: &Formula) {
        let output = self.brew.unlink(formula).await;
        self.steps.push(Step::new(
            StepKind::Unlink,
            formula.as_str(),
            Privilege::User,
            output,
        ));
    }

    async fn link(&mut self, formula: &Formula) {
        let output = self.brew.link(formula, false).await;
        self.steps.push(Step::new(
            StepKind::Link,
            formula.as_str(),
            Privilege::User,
            output,
        ));
    }
}
