use std::path::PathBuf;
use std::sync::Arc;

use phpswap_backend::{CommandOutput, Formula, Invocation, ProcessInvoker};

/// The single Laravel Valet command phpswap uses.
#[derive(Clone)]
pub struct ValetClient {
    invoker: Arc<dyn ProcessInvoker>,
    valet: PathBuf,
}

impl ValetClient {
    #[must_use]
    pub fn new(invoker: Arc<dyn ProcessInvoker>, valet: PathBuf) -> Self {
        Self { invoker, valet }
    }

    /// `sudo valet use <formula>`; Valet does its own unlink/link dance.
    pub async fn use_formula(&self, formula: &Formula) -> CommandOutput {
        let invocation = Invocation::new(&self.valet, ["use", formula.as_str()]).elevated();
        self.invoker.run(&invocation).await
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use phpswap_backend::{CommandOutput, Formula, Invocation, Privilege, ProcessInvoker};

    use super::ValetClient;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Invocation>>);

    #[async_trait]
    impl ProcessInvoker for Recorder {
        async fn run(&self, invocation: &Invocation) -> CommandOutput {
            self.0.lock().expect("lock").push(invocation.clone());
            CommandOutput::success("Valet is now using php@7.4.")
        }
    }

    #[tokio::test]
    async fn use_formula_is_elevated() {
        let recorder = Arc::new(Recorder::default());
        let valet = ValetClient::new(
            recorder.clone(),
            PathBuf::from("/Users/dev/.composer/vendor/bin/valet"),
        );

        let output = valet
            .use_formula(&Formula::versioned(&"7.4".parse().expect("valid version")))
            .await;

        assert!(output.is_success());
        let calls = recorder.0.lock().expect("lock");
        assert_eq!(calls[0].privilege, Privilege::Elevated);
        assert_eq!(calls[0].args, ["use", "php@7.4"]);
    }
}
