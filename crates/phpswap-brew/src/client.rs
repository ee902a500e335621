use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use phpswap_backend::{CommandOutput, Formula, Invocation, Privilege, ProcessInvoker};
use phpswap_platform::BrewPaths;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceAction {
    Start,
    Stop,
    Restart,
}

impl ServiceAction {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Restart => "restart",
        }
    }
}

impl fmt::Display for ServiceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The subset of the `brew` command surface phpswap relies on.
///
/// Every method returns the raw [`CommandOutput`]; deciding whether a failure
/// matters is left to the caller.
#[derive(Clone)]
pub struct BrewClient {
    invoker: Arc<dyn ProcessInvoker>,
    paths: BrewPaths,
    brew: PathBuf,
}

impl BrewClient {
    #[must_use]
    pub fn new(invoker: Arc<dyn ProcessInvoker>, paths: BrewPaths) -> Self {
        let brew = paths.brew_binary();
        Self {
            invoker,
            paths,
            brew,
        }
    }

    /// Use a `brew` executable outside of `<prefix>/bin`.
    #[must_use]
    pub fn with_brew_binary(mut self, brew: PathBuf) -> Self {
        self.brew = brew;
        self
    }

    #[must_use]
    pub fn paths(&self) -> &BrewPaths {
        &self.paths
    }

    #[must_use]
    pub fn invoker(&self) -> &Arc<dyn ProcessInvoker> {
        &self.invoker
    }

    fn invocation(&self, args: &[&str], privilege: Privilege) -> Invocation {
        Invocation::new(&self.brew, args.iter().copied()).with_privilege(privilege)
    }

    async fn brew(&self, args: &[&str], privilege: Privilege) -> CommandOutput {
        self.invoker.run(&self.invocation(args, privilege)).await
    }

    /// `brew unlink <formula>`. Unlinking a formula that is not linked is harmless.
    pub async fn unlink(&self, formula: &Formula) -> CommandOutput {
        self.brew(&["unlink", formula.as_str()], Privilege::User).await
    }

    /// `brew link <formula>`, optionally with `--overwrite --force`.
    pub async fn link(&self, formula: &Formula, force: bool) -> CommandOutput {
        if force {
            self.brew(
                &["link", formula.as_str(), "--overwrite", "--force"],
                Privilege::User,
            )
            .await
        } else {
            self.brew(&["link", formula.as_str()], Privilege::User).await
        }
    }

    /// `brew services <action> <service>`.
    pub async fn service(
        &self,
        action: ServiceAction,
        service: &str,
        privilege: Privilege,
    ) -> CommandOutput {
        self.brew(&["services", action.as_str(), service], privilege).await
    }

    /// `brew info <formula> --json=v2`.
    pub async fn info_json(&self, formula: &Formula) -> CommandOutput {
        self.brew(&["info", formula.as_str(), "--json=v2"], Privilege::User).await
    }

    /// Run `<prefix>/opt/<formula>/bin/<binary> <args>`.
    pub async fn run_formula_binary(
        &self,
        formula: &Formula,
        binary: &str,
        args: &[&str],
    ) -> CommandOutput {
        let program = self.paths.formula_binary(formula.as_str(), binary);
        self.invoker.run(&Invocation::new(program, args.iter().copied())).await
    }
}
