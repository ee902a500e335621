use log::info;

use phpswap_backend::{Formula, PhpVersion, Privilege};
use phpswap_brew::ValetClient;

use crate::report::{Step, StepKind, SwitchReport};

/// Switches by delegating to `valet use`, which does its own unlink and link.
#[derive(Clone)]
pub struct ValetSwitcher {
    valet: ValetClient,
}

impl ValetSwitcher {
    #[must_use]
    pub fn new(valet: ValetClient) -> Self {
        Self { valet }
    }

    /// Valet always receives the suffixed formula name.
    pub async fn switch(&self, target: PhpVersion) -> SwitchReport {
        info!("Switching to {target} using Valet");
        let formula = Formula::versioned(&target);
        let output = self.valet.use_formula(&formula).await;
        info!("{}", output.stdout.trim());

        SwitchReport {
            target,
            teardown: Vec::new(),
            activation: vec![Step::new(
                StepKind::ValetUse,
                formula.as_str(),
                Privilege::Elevated,
                output,
            )],
        }
    }
}
