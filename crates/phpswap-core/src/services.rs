use phpswap_backend::{Formula, Privilege};
use phpswap_brew::{BrewClient, ServiceAction};

use crate::report::{Step, StepKind};

/// Elevated `brew services` shortcuts for the local development stack.
#[derive(Clone)]
pub struct Services {
    brew: BrewClient,
}

impl Services {
    #[must_use]
    pub fn new(brew: BrewClient) -> Self {
        Self { brew }
    }

    /// Restart php-fpm for the linked formula.
    pub async fn restart_php_fpm(&self, formula: &Formula) -> Step {
        self.run(ServiceAction::Restart, formula.as_str()).await
    }

    pub async fn restart_nginx(&self) -> Step {
        self.run(ServiceAction::Restart, "nginx").await
    }

    pub async fn restart_dnsmasq(&self) -> Step {
        self.run(ServiceAction::Restart, "dnsmasq").await
    }

    /// Stop php-fpm, nginx and dnsmasq, in that order.
    pub async fn stop_all(&self, formula: &Formula) -> Vec<Step> {
        vec![
            self.run(ServiceAction::Stop, formula.as_str()).await,
            self.run(ServiceAction::Stop, "nginx").await,
            self.run(ServiceAction::Stop, "dnsmasq").await,
        ]
    }

    async fn run(&self, action: ServiceAction, name: &str) -> Step {
        let output = self.brew.service(action, name, Privilege::Elevated).await;
        Step::new(StepKind::Service(action), name, Privilege::Elevated, output)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use phpswap_backend::{Formula, Privilege};

    use super::Services;
    use crate::testing::{FakeBrew, brew_client};

    #[tokio::test]
    async fn stop_all_stops_stack_elevated() {
        let fake = Arc::new(FakeBrew::new());
        let services = Services::new(brew_client(&fake));

        let steps = services.stop_all(&Formula::default_php()).await;

        let targets: Vec<&str> = steps.iter().map(|s| s.target.as_str()).collect();
        assert_eq!(targets, ["php", "nginx", "dnsmasq"]);
        assert!(fake.calls().iter().all(|c| {
            c.invocation.privilege == Privilege::Elevated && c.verb() == "services stop"
        }));
    }

    #[tokio::test]
    async fn restart_php_fpm_targets_given_formula() {
        let fake = Arc::new(FakeBrew::new());
        let services = Services::new(brew_client(&fake));

        let step = services
            .restart_php_fpm(&Formula::versioned(&"7.4".parse().expect("valid version")))
            .await;

        assert_eq!(step.target, "php@7.4");
        assert_eq!(fake.calls()[0].invocation.args, ["services", "restart", "php@7.4"]);
    }
}
