use std::path::Path;
use tokio::process::Command;

/// Environment that keeps Homebrew quiet and its output machine-readable.
const QUIET_ENV: &[(&str, &str)] = &[
    ("HOMEBREW_NO_AUTO_UPDATE", "1"),
    ("HOMEBREW_NO_ENV_HINTS", "1"),
    ("HOMEBREW_NO_INSTALL_CLEANUP", "1"),
    ("NO_COLOR", "1"),
    ("TERM", "dumb"),
];

/// Build a command for `program`, routed through `sudo` when `elevated`.
///
/// `sudo` resets most of the environment, so the quiet variables are passed
/// on its command line as `VAR=value` assignments.
#[must_use]
pub fn build_command(program: &Path, args: &[String], elevated: bool) -> Command {
    let mut cmd = if elevated {
        let mut cmd = Command::new("sudo");
        for (key, value) in QUIET_ENV {
            cmd.arg(format!("{key}={value}"));
        }
        cmd.arg(program);
        cmd
    } else {
        let mut cmd = Command::new(program);
        cmd.envs(QUIET_ENV.iter().copied());
        cmd
    };

    cmd.args(args);
    cmd.kill_on_drop(true);
    cmd
}
