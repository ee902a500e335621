use log::{debug, warn};
use serde::Deserialize;

use phpswap_backend::{BackendError, Formula, LongVersion, PhpVersion};
use phpswap_platform::PHP_CONFIG_BINARY;

use crate::client::BrewClient;

#[derive(Debug, Deserialize)]
struct BrewInfo {
    #[serde(default)]
    formulae: Vec<FormulaInfo>,
}

#[derive(Debug, Deserialize)]
struct FormulaInfo {
    versions: FormulaVersions,
}

#[derive(Debug, Deserialize)]
struct FormulaVersions {
    stable: Option<String>,
}

/// Extract the `major.minor` of the stable `php` formula from `brew info --json=v2`.
///
/// # Errors
/// Returns an error if the JSON is malformed or carries no stable version.
pub fn parse_brew_info(json: &str) -> Result<PhpVersion, BackendError> {
    let info: BrewInfo = serde_json::from_str(json)
        .map_err(|e| BackendError::alias_unresolved(format!("invalid brew info JSON: {e}")))?;

    let stable = info
        .formulae
        .into_iter()
        .next()
        .and_then(|formula| formula.versions.stable)
        .ok_or_else(|| BackendError::alias_unresolved("brew info reported no stable version"))?;

    LongVersion::parse(&stable)?
        .short()
        .ok_or_else(|| BackendError::alias_unresolved(format!("unrecognised version {stable}")))
}

/// Work out which release the unsuffixed `php` formula points at.
///
/// Asks Homebrew first; if that fails, asks the installed `php` formula's
/// `php-config` directly.
///
/// # Errors
/// Returns an error when neither source yields a version.
pub async fn resolve_default_version(brew: &BrewClient) -> Result<PhpVersion, BackendError> {
    let formula = Formula::default_php();

    let info = brew.info_json(&formula).await;
    if info.is_success() {
        match parse_brew_info(&info.stdout) {
            Ok(version) => {
                debug!("brew reports the default php formula as {version}");
                return Ok(version);
            }
            Err(e) => warn!("Could not parse brew info output: {e}"),
        }
    } else {
        debug!("brew info php failed: {}", info.stderr.trim());
    }

    let output = brew
        .run_formula_binary(&formula, PHP_CONFIG_BINARY, &["--version"])
        .await;
    if !output.is_success() {
        return Err(BackendError::alias_unresolved(
            "neither brew info nor php-config reported a version",
        ));
    }

    LongVersion::parse(&output.stdout)?
        .short()
        .ok_or_else(|| BackendError::alias_unresolved(output.stdout.trim().to_string()))
}
