use async_trait::async_trait;
use crossbeam_channel::{Receiver, Sender};
use log::{debug, info, trace, warn};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use phpswap_backend::{CommandOutput, HistoryItem, Invocation, Privilege, ProcessInvoker};
use phpswap_platform::build_command;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const DEFAULT_HISTORY_LIMIT: usize = 200;

/// Runs commands on the host and keeps a bounded history of what ran.
pub struct ShellInvoker {
    timeout: Duration,
    history_limit: usize,
    history: Mutex<VecDeque<HistoryItem>>,
    subscribers: Mutex<Vec<Sender<HistoryItem>>>,
}

impl Default for ShellInvoker {
    fn default() -> Self {
        Self::new()
    }
}

impl ShellInvoker {
    #[must_use]
    pub fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            history_limit: DEFAULT_HISTORY_LIMIT,
            history: Mutex::new(VecDeque::new()),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Snapshot of the recorded history, oldest first.
    pub fn history(&self) -> Vec<HistoryItem> {
        self.history
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Receive every command as soon as it completes.
    pub fn subscribe(&self) -> Receiver<HistoryItem> {
        let (tx, rx) = crossbeam_channel::unbounded();
        self.subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(tx);
        rx
    }

    fn record(&self, item: HistoryItem) {
        {
            let mut history = self
                .history
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            history.push_back(item.clone());
            while history.len() > self.history_limit {
                history.pop_front();
            }
        }

        let mut subscribers = self
            .subscribers
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        subscribers.retain(|tx| tx.send(item.clone()).is_ok());
    }

    async fn execute(&self, invocation: &Invocation) -> CommandOutput {
        let elevated = invocation.privilege == Privilege::Elevated;
        let mut cmd = build_command(&invocation.program, &invocation.args, elevated);

        match tokio::time::timeout(self.timeout, cmd.output()).await {
            Ok(Ok(output)) => CommandOutput {
                status: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            },
            Ok(Err(error)) => {
                warn!("Failed to spawn `{invocation}`: {error}");
                CommandOutput::not_run(error.to_string())
            }
            Err(_) => {
                warn!(
                    "`{invocation}` timed out after {}s",
                    self.timeout.as_secs()
                );
                CommandOutput::not_run(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                ))
            }
        }
    }
}

#[async_trait]
impl ProcessInvoker for ShellInvoker {
    async fn run(&self, invocation: &Invocation) -> CommandOutput {
        info!("Executing command: {invocation}");

        let output = self.execute(invocation).await;

        debug!("Command exit status: {}", output.status_label());
        trace!("stdout: {}", output.stdout);
        if !output.stderr.is_empty() {
            trace!("stderr: {}", output.stderr);
        }

        self.record(HistoryItem {
            date: chrono::Local::now(),
            command: invocation.to_string(),
            output: output.clone(),
        });

        output
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::time::Duration;

    use phpswap_backend::{Invocation, ProcessInvoker};

    use super::ShellInvoker;

    #[tokio::test]
    async fn run_captures_stdout_and_status() {
        let invoker = ShellInvoker::new();

        let output = invoker.run(&Invocation::new("sh", ["-c", "printf hello; exit 3"])).await;

        assert_eq!(output.stdout, "hello");
        assert_eq!(output.status, Some(3));
    }

    #[tokio::test]
    async fn missing_program_yields_output_without_status() {
        let invoker = ShellInvoker::new();

        let output = invoker.run(&Invocation::new("/nonexistent/phpswap-test-binary", ["x"])).await;

        assert_eq!(output.status, None);
        assert!(!output.stderr.is_empty());
    }

    #[tokio::test]
    async fn slow_command_times_out() {
        let invoker = ShellInvoker::new().with_timeout(Duration::from_millis(50));

        let output = invoker.run(&Invocation::new("sleep", ["5"])).await;

        assert_eq!(output.status, None);
        assert!(output.stderr.contains("timed out"));
    }

    #[tokio::test]
    async fn history_is_bounded_and_broadcast() {
        let invoker = ShellInvoker::new().with_history_limit(2);
        let rx = invoker.subscribe();

        for word in ["one", "two", "three"] {
            invoker.run(&Invocation::new("echo", [word])).await;
        }

        let history = invoker.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].command, "echo two");
        assert_eq!(history[1].output.stdout.trim(), "three");

        let received: Vec<String> = rx.try_iter().map(|item| item.command).collect();
        assert_eq!(received, ["echo one", "echo two", "echo three"]);
    }
}
