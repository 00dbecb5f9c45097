//! Publish version numbers.
//!
//! Versions are written `v1.2.3` (the leading `v` is optional on input) and
//! must be valid semantic versions without pre-release or build metadata.

use std::fmt;
use std::str::FromStr;

use semver::Version;

/// A validated publish version number.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VersionNumber(Version);

impl VersionNumber {
    /// The next patch version, used to prefill the version field.
    /// `None` when the patch component is already at its maximum.
    pub fn next_patch(&self) -> Option<Self> {
        let patch = self.0.patch.checked_add(1)?;
        Some(Self(Version::new(self.0.major, self.0.minor, patch)))
    }

    /// Canonical form for comparing against history entries.
    pub fn same_as(&self, other: &str) -> bool {
        other.parse::<VersionNumber>().is_ok_and(|v| v == *self)
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl FromStr for VersionNumber {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let bare = trimmed
            .strip_prefix('v')
            .or_else(|| trimmed.strip_prefix('V'))
            .unwrap_or(trimmed);
        let version =
            Version::parse(bare).map_err(|e| format!("invalid version number '{s}': {e}"))?;
        if !version.pre.is_empty() || !version.build.is_empty() {
            return Err(format!(
                "invalid version number '{s}': pre-release and build tags are not allowed"
            ));
        }
        Ok(Self(version))
    }
}

/// Suggest the version to prefill, given the last published one.
///
/// Falls back to `v0.0.1` when there is no (parsable) previous version or
/// its patch component cannot be bumped.
pub fn suggest_next_version(last: &str) -> String {
    last.parse::<VersionNumber>()
        .ok()
        .and_then(|v| v.next_patch())
        .map_or_else(|| "v0.0.1".to_string(), |v| v.to_string())
}
