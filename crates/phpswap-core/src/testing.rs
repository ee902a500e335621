use std::collections::{BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use phpswap_backend::{CommandOutput, Invocation, PhpVersion, ProcessInvoker};
use phpswap_brew::BrewClient;
use phpswap_platform::BrewPaths;

pub(crate) const PREFIX: &str = "/opt/homebrew";

/// A recorded call, stamped with a logical clock at start and finish.
#[derive(Debug, Clone)]
pub(crate) struct Recorded {
    pub started: usize,
    pub finished: usize,
    pub invocation: Invocation,
}

impl Recorded {
    pub fn verb(&self) -> String {
        match self.invocation.args.first().map(String::as_str) {
            Some("services") => format!("services {}", self.invocation.args[1]),
            Some(other) => other.to_string(),
            None => String::new(),
        }
    }

    pub fn target(&self) -> &str {
        match self.invocation.args.first().map(String::as_str) {
            Some("services") => &self.invocation.args[2],
            _ => self.invocation.args.get(1).map_or("", String::as_str),
        }
    }
}

/// Pretends to be Homebrew: keeps a set of linked formulae and answers
/// `php-config --version` from a table.
#[derive(Default)]
pub(crate) struct FakeBrew {
    clock: AtomicUsize,
    calls: Mutex<Vec<Recorded>>,
    linked: Mutex<BTreeSet<String>>,
    existing: Mutex<Vec<PathBuf>>,
    long_versions: HashMap<String, String>,
    failing: bool,
    stagger: bool,
    panic_on_unlink: Option<String>,
}

impl FakeBrew {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every command exits 1.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// `unlink <formula>` panics instead of answering.
    pub fn panicking_on_unlink(mut self, formula: &str) -> Self {
        self.panic_on_unlink = Some(formula.to_string());
        self
    }

    /// Teardown commands sleep for a formula-dependent time.
    pub fn staggered(mut self) -> Self {
        self.stagger = true;
        self
    }

    pub fn with_long_version(mut self, formula: &str, long: &str) -> Self {
        self.long_versions
            .insert(formula.to_string(), long.to_string());
        self
    }

    pub fn with_binary(self, formula: &str) -> Self {
        self.existing
            .lock()
            .expect("lock")
            .push(BrewPaths::new(PREFIX).formula_binary(formula, "php"));
        self
    }

    pub fn with_linked(self, formula: &str) -> Self {
        self.linked.lock().expect("lock").insert(formula.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn linked(&self) -> BTreeSet<String> {
        self.linked.lock().expect("lock").clone()
    }

    fn delay_for(&self, invocation: &Invocation) -> Duration {
        if !self.stagger {
            return Duration::ZERO;
        }
        let seed: usize = invocation.args.iter().map(String::len).sum::<usize>()
            + invocation
                .args
                .last()
                .map_or(0, |arg| arg.bytes().map(usize::from).sum());
        Duration::from_millis((seed % 7) as u64 * 3)
    }

    fn respond(&self, invocation: &Invocation) -> CommandOutput {
        if self.failing {
            return CommandOutput::failure(1, "Error: simulated failure");
        }

        let args: Vec<&str> = invocation.args.iter().map(String::as_str).collect();
        if let ["unlink", formula] = args.as_slice()
            && self.panic_on_unlink.as_deref() == Some(*formula)
        {
            panic!("unlink {formula} crashed");
        }
        match args.as_slice() {
            ["unlink", formula] => {
                self.linked.lock().expect("lock").remove(*formula);
                CommandOutput::success(format!("Unlinking {formula}... 0 symlinks removed."))
            }
            ["link", formula, ..] => {
                self.linked
                    .lock()
                    .expect("lock")
                    .insert((*formula).to_string());
                CommandOutput::success(format!("Linking {formula}... 25 symlinks created."))
            }
            ["--version"] => {
                let formula = invocation
                    .program
                    .parent()
                    .and_then(Path::parent)
                    .and_then(Path::file_name)
                    .and_then(|name| name.to_str())
                    .unwrap_or_default();
                self.long_versions.get(formula).map_or_else(
                    || CommandOutput::not_run("No such file or directory"),
                    |long| CommandOutput::success(format!("{long}\n")),
                )
            }
            _ => CommandOutput::success(""),
        }
    }
}

#[async_trait]
impl ProcessInvoker for FakeBrew {
    async fn run(&self, invocation: &Invocation) -> CommandOutput {
        let started = self.clock.fetch_add(1, Ordering::SeqCst);
        let delay = self.delay_for(invocation);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let output = self.respond(invocation);
        let finished = self.clock.fetch_add(1, Ordering::SeqCst);

        self.calls.lock().expect("lock").push(Recorded {
            started,
            finished,
            invocation: invocation.clone(),
        });
        output
    }

    fn file_exists(&self, path: &Path) -> bool {
        self.existing.lock().expect("lock").iter().any(|p| p == path)
    }
}

pub(crate) fn brew_client(fake: &Arc<FakeBrew>) -> BrewClient {
    BrewClient::new(fake.clone(), BrewPaths::new(PREFIX))
}

pub(crate) fn version(s: &str) -> PhpVersion {
    s.parse().expect("valid version in test")
}

pub(crate) fn versions(list: &[&str]) -> Vec<PhpVersion> {
    list.iter().map(|s| version(s)).collect()
}
