use async_trait::async_trait;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::BackendError;

/// Whether a command runs as the current user or through `sudo`.
///
/// Always passed explicitly; nothing infers it from the command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Privilege {
    #[default]
    User,
    Elevated,
}

/// A fully described external command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub privilege: Privilege,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            privilege: Privilege::User,
        }
    }

    #[must_use]
    pub fn with_privilege(mut self, privilege: Privilege) -> Self {
        self.privilege = privilege;
        self
    }

    #[must_use]
    pub fn elevated(self) -> Self {
        self.with_privilege(Privilege::Elevated)
    }

    #[must_use]
    pub fn program_name(&self) -> &str {
        self.program
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default()
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.privilege == Privilege::Elevated {
            f.write_str("sudo ")?;
        }
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of one external command.
///
/// `status` is `None` when the process never produced an exit code: it could
/// not be spawned, it was killed by a signal, or it timed out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CommandOutput {
    pub status: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    #[must_use]
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            status: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    #[must_use]
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        Self {
            status: Some(status),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    #[must_use]
    pub fn not_run(reason: impl Into<String>) -> Self {
        Self {
            status: None,
            stdout: String::new(),
            stderr: reason.into(),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == Some(0)
    }

    #[must_use]
    pub fn status_label(&self) -> String {
        match self.status {
            Some(code) => format!("exit {code}"),
            None => "no exit status".to_string(),
        }
    }

    /// Trimmed stdout on success.
    ///
    /// # Errors
    /// Returns [`BackendError::CommandFailed`] when the command did not exit with 0.
    pub fn into_result(self, invocation: &Invocation) -> Result<String, BackendError> {
        if self.is_success() {
            Ok(self.stdout.trim().to_string())
        } else {
            Err(BackendError::CommandFailed {
                command: invocation.to_string(),
                status: self.status_label(),
                stderr: self.stderr.trim().to_string(),
            })
        }
    }
}

/// One entry of the command history kept by an invoker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryItem {
    pub date: chrono::DateTime<chrono::Local>,
    pub command: String,
    pub output: CommandOutput,
}

/// Runs external commands.
///
/// Implementations never fail at the type level: every problem ends up in the
/// returned [`CommandOutput`].
#[async_trait]
pub trait ProcessInvoker: Send + Sync {
    async fn run(&self, invocation: &Invocation) -> CommandOutput;

    fn file_exists(&self, path: &Path) -> bool {
        path.is_file()
    }
}
