use std::fmt;

use phpswap_backend::{CommandOutput, PhpVersion, Privilege};
use phpswap_brew::ServiceAction;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Unlink,
    Link,
    Service(ServiceAction),
    ValetUse,
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unlink => f.write_str("unlink"),
            Self::Link => f.write_str("link"),
            Self::Service(action) => write!(f, "services {action}"),
            Self::ValetUse => f.write_str("valet use"),
        }
    }
}

/// One external command issued during a switch, repair or service action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub kind: StepKind,
    /// Formula or service name the command addressed.
    pub target: String,
    pub privilege: Privilege,
    pub output: CommandOutput,
}

impl Step {
    pub fn new(
        kind: StepKind,
        target: impl Into<String>,
        privilege: Privilege,
        output: CommandOutput,
    ) -> Self {
        Self {
            kind,
            target: target.into(),
            privilege,
            output,
        }
    }

    /// Unlinking something that was never linked is expected, so unlink
    /// results never count as failures.
    #[must_use]
    pub fn is_failure(&self) -> bool {
        self.kind != StepKind::Unlink && !self.output.is_success()
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.privilege == Privilege::Elevated {
            f.write_str("sudo ")?;
        }
        write!(f, "{} {} ({})", self.kind, self.target, self.output.status_label())
    }
}

/// Result of a switch attempt.
///
/// Completion does not mean the switch worked; check [`SwitchReport::is_clean`]
/// and re-run detection to learn the real state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SwitchReport {
    pub target: PhpVersion,
    /// Unlink/stop results, in completion order.
    pub teardown: Vec<Step>,
    /// Link/start results, in execution order.
    pub activation: Vec<Step>,
}

impl SwitchReport {
    pub fn failures(&self) -> impl Iterator<Item = &Step> {
        self.teardown
            .iter()
            .chain(self.activation.iter())
            .filter(|step| step.is_failure())
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}
