use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Formula name Homebrew uses for whichever PHP release is currently "latest".
pub const DEFAULT_FORMULA: &str = "php";

/// Prefix shared by every version-suffixed PHP formula (`php@8.0`).
pub const VERSIONED_FORMULA_PREFIX: &str = "php@";

const DEFAULT_SUPPORTED: &[&str] = &[
    "5.6", "7.0", "7.1", "7.2", "7.3", "7.4", "8.0", "8.1", "8.2", "8.3", "8.4",
];

/// A `major.minor` release token such as `8.0`.
///
/// The original text is kept verbatim so that it round-trips with the
/// directory names Homebrew uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PhpVersion(String);

impl PhpVersion {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn components(&self) -> (u32, u32) {
        let mut parts = self.0.split('.');
        let major = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        let minor = parts.next().and_then(|p| p.parse().ok()).unwrap_or(0);
        (major, minor)
    }
}

impl Ord for PhpVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.components()
            .cmp(&other.components())
            .then_with(|| self.0.cmp(&other.0))
    }
}

impl PartialOrd for PhpVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PhpVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VersionParseError {
    #[error("Expected X.Y format, got: {input}")]
    InvalidFormat { input: String },
    #[error("Empty version string")]
    Empty,
}

impl FromStr for PhpVersion {
    type Err = VersionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(VersionParseError::Empty);
        }

        let invalid = || VersionParseError::InvalidFormat {
            input: s.to_string(),
        };

        let (major, minor) = s.split_once('.').ok_or_else(invalid)?;
        let is_number = |part: &str| !part.is_empty() && part.bytes().all(|b| b.is_ascii_digit());
        if !is_number(major) || !is_number(minor) {
            return Err(invalid());
        }

        Ok(Self(s.to_string()))
    }
}

impl TryFrom<String> for PhpVersion {
    type Error = VersionParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PhpVersion> for String {
    fn from(value: PhpVersion) -> Self {
        value.0
    }
}

/// Fixed allowlist of releases the tool is willing to manage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportedVersions {
    versions: Vec<PhpVersion>,
}

impl SupportedVersions {
    /// Builds an allowlist from raw strings, silently skipping malformed ones.
    pub fn from_strs<I, S>(raw: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            versions: raw
                .into_iter()
                .filter_map(|s| s.as_ref().parse().ok())
                .collect(),
        }
    }

    #[must_use]
    pub fn contains(&self, version: &PhpVersion) -> bool {
        self.versions.contains(version)
    }

    #[must_use]
    pub fn contains_str(&self, version: &str) -> bool {
        self.versions.iter().any(|v| v.as_str() == version)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PhpVersion> {
        self.versions.iter()
    }
}

impl Default for SupportedVersions {
    fn default() -> Self {
        Self::from_strs(DEFAULT_SUPPORTED)
    }
}

/// The package manager's name for one PHP installation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Formula(String);

impl Formula {
    /// The unsuffixed `php` formula.
    #[must_use]
    pub fn default_php() -> Self {
        Self(DEFAULT_FORMULA.to_string())
    }

    /// Always the suffixed name, e.g. `php@7.4`.
    #[must_use]
    pub fn versioned(version: &PhpVersion) -> Self {
        Self(format!("{VERSIONED_FORMULA_PREFIX}{version}"))
    }

    /// Bare `php` when `version` is the aliased default, the suffixed name otherwise.
    #[must_use]
    pub fn for_version(version: &PhpVersion, alias: Option<&PhpVersion>) -> Self {
        if alias == Some(version) {
            Self::default_php()
        } else {
            Self::versioned(version)
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_default(&self) -> bool {
        self.0 == DEFAULT_FORMULA
    }
}

impl fmt::Display for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Full release string reported by a PHP binary, e.g. `8.0.27`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LongVersion {
    pub raw: String,
    #[serde(skip)]
    pub semver: Option<semver::Version>,
}

impl LongVersion {
    /// Parses the output of `php-config --version`.
    ///
    /// Pre-release builds such as `8.1.0RC1` are not valid semver; those keep
    /// only the raw text.
    ///
    /// # Errors
    /// Returns an error when the input is blank.
    pub fn parse(input: &str) -> Result<Self, VersionParseError> {
        let raw = input.lines().next().unwrap_or("").trim();
        if raw.is_empty() {
            return Err(VersionParseError::Empty);
        }

        Ok(Self {
            raw: raw.to_string(),
            semver: semver::Version::parse(raw).ok(),
        })
    }

    /// The `major.minor` identifier this release belongs to.
    #[must_use]
    pub fn short(&self) -> Option<PhpVersion> {
        if let Some(version) = &self.semver {
            return format!("{}.{}", version.major, version.minor).parse().ok();
        }

        let mut parts = self.raw.split('.');
        let major = parts.next()?;
        let minor: String = parts
            .next()?
            .chars()
            .take_while(char::is_ascii_digit)
            .collect();
        format!("{major}.{minor}").parse().ok()
    }
}

impl fmt::Display for LongVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One detected installation. Recomputed on every detection pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstalledVersion {
    pub version: PhpVersion,
    pub formula: Formula,
    pub has_binary: bool,
}

/// Registry entry: an installed version together with what its binary reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhpInstallation {
    pub version: PhpVersion,
    pub formula: Formula,
    pub long_version: Option<LongVersion>,
}
