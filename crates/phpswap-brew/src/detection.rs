use std::path::PathBuf;
use which::which;

use phpswap_backend::{Invocation, ProcessInvoker};
use phpswap_platform::BrewPaths;

#[derive(Debug, Clone)]
pub struct BrewDetection {
    pub path: Option<PathBuf>,
    pub version: Option<String>,
    pub in_path: bool,
}

/// Find the `brew` executable, preferring the one inside `paths`.
pub async fn detect_brew(invoker: &dyn ProcessInvoker, paths: &BrewPaths) -> BrewDetection {
    let prefixed = paths.brew_binary();
    let (path, in_path) = if invoker.file_exists(&prefixed) {
        (Some(prefixed), false)
    } else {
        match which("brew") {
            Ok(path) => (Some(path), true),
            Err(_) => (None, false),
        }
    };

    let Some(path) = path else {
        log::warn!("Homebrew could not be found");
        return BrewDetection {
            path: None,
            version: None,
            in_path: false,
        };
    };

    let output = invoker.run(&Invocation::new(&path, ["--version"])).await;
    let version = output
        .is_success()
        .then(|| parse_brew_version(&output.stdout))
        .flatten();

    BrewDetection {
        path: Some(path),
        version,
        in_path,
    }
}

/// Locate Laravel Valet, which Composer installs into the user's home.
#[must_use]
pub fn detect_valet() -> Option<PathBuf> {
    if let Ok(path) = which("valet") {
        return Some(path);
    }

    common_valet_paths().into_iter().find(|path| path.exists())
}

fn common_valet_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".composer").join("vendor").join("bin").join("valet"));
        paths.push(
            home.join(".config")
                .join("composer")
                .join("vendor")
                .join("bin")
                .join("valet"),
        );
    }

    paths.push(PathBuf::from("/usr/local/bin/valet"));
    paths.push(PathBuf::from("/opt/homebrew/bin/valet"));
    paths
}

fn parse_brew_version(stdout: &str) -> Option<String> {
    let first = stdout.lines().next()?.trim();
    let version = first.strip_prefix("Homebrew ").unwrap_or(first).trim();
    (!version.is_empty()).then(|| version.to_string())
}
