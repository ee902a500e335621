use log::info;
use std::path::Path;

use phpswap_backend::BackendError;
use phpswap_brew::TextTools;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtensionKind {
    Regular,
    Zend,
}

/// An `extension=` or `zend_extension=` directive in php.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhpExtension {
    pub name: String,
    pub kind: ExtensionKind,
    /// The directive exactly as written, without a leading `;`.
    pub line: String,
    pub enabled: bool,
}

impl PhpExtension {
    #[must_use]
    pub fn disabled_line(&self) -> String {
        format!(";{}", self.line)
    }
}

/// Find extension directives, commented out or not. The first directive for
/// each extension name wins.
#[must_use]
pub fn parse_extensions(ini: &str) -> Vec<PhpExtension> {
    let mut extensions: Vec<PhpExtension> = Vec::new();

    for raw in ini.lines() {
        let trimmed = raw.trim();
        let (enabled, directive) = match trimmed.strip_prefix(';') {
            Some(rest) => (false, rest),
            None => (true, trimmed),
        };

        let (kind, rest) = if let Some(rest) = directive.strip_prefix("zend_extension") {
            (ExtensionKind::Zend, rest)
        } else if let Some(rest) = directive.strip_prefix("extension") {
            (ExtensionKind::Regular, rest)
        } else {
            continue;
        };

        let Some(value) = rest.trim_start().strip_prefix('=') else {
            continue;
        };
        let value = value.trim().trim_matches('"');
        let Some(name) = Path::new(value)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .filter(|stem| !stem.is_empty())
        else {
            continue;
        };

        if extensions.iter().any(|existing| existing.name == name) {
            continue;
        }

        extensions.push(PhpExtension {
            name: name.to_string(),
            kind,
            line: directive.to_string(),
            enabled,
        });
    }

    extensions
}

/// Read and parse the extension directives of one php.ini.
///
/// # Errors
/// Returns [`CoreError::IniNotFound`] if the file cannot be read.
pub fn read_extensions(ini: &Path) -> Result<Vec<PhpExtension>, CoreError> {
    let content = std::fs::read_to_string(ini).map_err(|_| CoreError::IniNotFound {
        path: ini.to_path_buf(),
    })?;
    Ok(parse_extensions(&content))
}

/// Enables and disables extensions by (un)commenting their directive.
#[derive(Clone)]
pub struct ExtensionToggler {
    text: TextTools,
}

impl ExtensionToggler {
    #[must_use]
    pub fn new(text: TextTools) -> Self {
        Self { text }
    }

    /// Returns whether the file was changed. The current state is taken from
    /// the first directive for the extension, as [`parse_extensions`] reports it.
    ///
    /// # Errors
    /// Returns an error when the php.ini is missing, does not mention the
    /// extension, or sed fails.
    pub async fn set_enabled(
        &self,
        ini: &Path,
        extension: &PhpExtension,
        enabled: bool,
    ) -> Result<bool, CoreError> {
        if !ini.is_file() {
            return Err(CoreError::IniNotFound {
                path: ini.to_path_buf(),
            });
        }

        let current = read_extensions(ini)?
            .into_iter()
            .find(|found| found.name == extension.name)
            .ok_or_else(|| CoreError::ExtensionNotFound {
                name: extension.name.clone(),
            })?;
        if current.enabled == enabled {
            return Ok(false);
        }

        let disabled_line = current.disabled_line();
        let (from, to) = if enabled {
            (disabled_line.as_str(), current.line.as_str())
        } else {
            (current.line.as_str(), disabled_line.as_str())
        };

        let output = self.text.sed(ini, from, to).await;
        if !output.is_success() || !self.text.grep_contains(ini, to).await {
            return Err(BackendError::CommandFailed {
                command: "sed".to_string(),
                status: output.status_label(),
                stderr: output.stderr.trim().to_string(),
            }
            .into());
        }

        info!(
            "{} extension {} in {}",
            if enabled { "Enabled" } else { "Disabled" },
            extension.name,
            ini.display()
        );
        Ok(true)
    }
}
