//! Fixed-width, order-preserving encoding of semantic versions.
//!
//! `major`, `minor` and `patch` are each left-padded to 16 decimal digits and
//! concatenated, so comparing two encodings as strings (which is what SQLite
//! does on a `TEXT` column) agrees with numeric comparison of the release
//! triple. Prerelease and build suffixes do not take part in the encoding;
//! prereleases are tracked separately through [`PaddingSemVer::is_pre_release`].

use crate::error::{RegistryError, RegistryResult};
use semver::Version;

/// Width of one encoded component.
pub const COMPONENT_WIDTH: usize = 16;

/// Lower bound used for the unconstrained comparator. Every encoding is `>=` to it.
pub const ANY_VERSION: &str = "000000000000000000000000000000000000000000000000";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaddingSemVer {
    padding_version: String,
    is_pre_release: bool,
}

impl PaddingSemVer {
    /// Encodes `version`.
    ///
    /// Strings that are not strict semver degrade to [`ANY_VERSION`] and are
    /// flagged as prerelease, so they sort first and never match a default
    /// range. Fails only when a component needs more than 16 digits.
    pub fn new(version: &str) -> RegistryResult<Self> {
        match parse_strict(version) {
            Some(parsed) => Self::from_version(&parsed),
            None => Ok(Self {
                padding_version: ANY_VERSION.to_string(),
                is_pre_release: true,
            }),
        }
    }

    pub fn from_version(version: &Version) -> RegistryResult<Self> {
        let padding_version = format!(
            "{}{}{}",
            Self::pad(version.major)?,
            Self::pad(version.minor)?,
            Self::pad(version.patch)?
        );
        Ok(Self {
            padding_version,
            is_pre_release: !version.pre.is_empty(),
        })
    }

    pub fn pad(component: u64) -> RegistryResult<String> {
        let digits = component.to_string();
        if digits.len() > COMPONENT_WIDTH {
            return Err(RegistryError::InvalidVersion(format!(
                "version component {digits} is longer than {COMPONENT_WIDTH} digits"
            )));
        }
        Ok(format!("{digits:0>width$}", width = COMPONENT_WIDTH))
    }

    pub fn any_version() -> &'static str {
        ANY_VERSION
    }

    pub fn padding_version(&self) -> &str {
        &self.padding_version
    }

    pub fn is_pre_release(&self) -> bool {
        self.is_pre_release
    }

    pub fn into_parts(self) -> (String, bool) {
        (self.padding_version, self.is_pre_release)
    }
}

/// Strict semver parse tolerating surrounding whitespace and a single leading
/// `=` or `v`, the way npm clients normalise exact versions.
pub fn parse_strict(version: &str) -> Option<Version> {
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('=').unwrap_or(trimmed).trim_start();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);
    Version::parse(trimmed).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(version: &str) -> String {
        PaddingSemVer::new(version).unwrap().padding_version().to_string()
    }

    #[test]
    fn test_pads_each_component_to_sixteen_digits() {
        assert_eq!(
            encode("0.9007199254740991.0"),
            format!("{}{}{}", "0".repeat(16), "9007199254740991", "0".repeat(16))
        );
        assert_eq!(encode("1.2.3").len(), 48);
    }

    #[test]
    fn test_string_order_matches_semver_order() {
        let ordered = ["0.0.1", "0.1.0", "0.9.9", "0.10.0", "1.0.0", "1.2.10", "2.0.0", "10.0.0"];
        for pair in ordered.windows(2) {
            assert!(encode(pair[0]) < encode(pair[1]), "{} < {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_prerelease_and_build_ignored_in_encoding() {
        assert_eq!(encode("1.0.0-beta.1"), encode("1.0.0"));
        assert_eq!(encode("1.0.0+build.5"), encode("1.0.0"));
        assert!(PaddingSemVer::new("1.0.0-beta.1").unwrap().is_pre_release());
        assert!(!PaddingSemVer::new("1.0.0+build.5").unwrap().is_pre_release());
        assert!(!PaddingSemVer::new("1.0.0").unwrap().is_pre_release());
    }

    #[test]
    fn test_invalid_version_degrades_to_any() {
        let encoded = PaddingSemVer::new("not-a-version").unwrap();
        assert_eq!(encoded.padding_version(), ANY_VERSION);
        assert!(encoded.is_pre_release());
    }

    #[test]
    fn test_any_version_is_lowest_encoding() {
        assert_eq!(ANY_VERSION.len(), 3 * COMPONENT_WIDTH);
        assert!(ANY_VERSION.chars().all(|c| c == '0'));
        assert_eq!(encode("0.0.0"), ANY_VERSION);
        assert!(encode("0.0.1").as_str() > ANY_VERSION);
    }

    #[test]
    fn test_leading_equals_and_v_are_tolerated() {
        assert_eq!(encode("=1.2.3"), encode("1.2.3"));
        assert_eq!(encode("v1.2.3"), encode("1.2.3"));
    }

    #[test]
    fn test_component_overflow_fails() {
        let err = PaddingSemVer::new("12345678901234567.0.0").unwrap_err();
        assert!(matches!(err, RegistryError::InvalidVersion(_)));
        assert!(PaddingSemVer::pad(9_999_999_999_999_999).is_ok());
    }
}
