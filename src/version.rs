//! Semantic version parsing for the version macros

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static SEMVER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^v?(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)\.(0|[1-9][0-9]*)(?:-[0-9A-Za-z.-]+)?(?:\+[0-9A-Za-z.-]+)?$",
    )
    .unwrap()
});

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("'{0}' is not a semantic version (expected MAJOR.MINOR.PATCH)")]
    Malformed(String),

    #[error("version component '{0}' is out of range")]
    OutOfRange(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct VersionTriple {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl VersionTriple {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        VersionTriple { major, minor, patch }
    }

    /// `#define <prefix>_MAJOR ...` lines for major, minor and patch.
    pub fn macros(&self, prefix: &str) -> String {
        format!(
            "#define {p}_MAJOR {}\n#define {p}_MINOR {}\n#define {p}_PATCH {}\n",
            self.major,
            self.minor,
            self.patch,
            p = prefix
        )
    }
}

impl FromStr for VersionTriple {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let caps = SEMVER
            .captures(s.trim())
            .ok_or_else(|| VersionError::Malformed(s.to_string()))?;
        let component = |i: usize| -> Result<u64, VersionError> {
            let text = &caps[i];
            text.parse()
                .map_err(|_| VersionError::OutOfRange(text.to_string()))
        };
        Ok(VersionTriple {
            major: component(1)?,
            minor: component(2)?,
            patch: component(3)?,
        })
    }
}

impl fmt::Display for VersionTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("2.5.10", VersionTriple::new(2, 5, 10))]
    #[case("0.0.0", VersionTriple::new(0, 0, 0))]
    #[case("v1.2.3", VersionTriple::new(1, 2, 3))]
    #[case(" 4.0.1\n", VersionTriple::new(4, 0, 1))]
    #[case("1.0.0-rc.1+build.7", VersionTriple::new(1, 0, 0))]
    fn parses_valid_versions(#[case] input: &str, #[case] expected: VersionTriple) {
        assert_eq!(input.parse::<VersionTriple>(), Ok(expected));
    }

    #[rstest]
    #[case("not-a-version")]
    #[case("1.2")]
    #[case("1.2.3.4")]
    #[case("01.2.3")]
    #[case("-1.2.3")]
    #[case("")]
    fn rejects_malformed_versions(#[case] input: &str) {
        assert!(matches!(
            input.parse::<VersionTriple>(),
            Err(VersionError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_oversized_component() {
        let err = "99999999999999999999.0.0".parse::<VersionTriple>().unwrap_err();
        assert_eq!(err, VersionError::OutOfRange("99999999999999999999".into()));
    }

    #[test]
    fn renders_macros_in_order() {
        let v: VersionTriple = "2.5.10".parse().unwrap();
        insta::assert_snapshot!(v.macros("LLRTSP_VERSION").trim_end(), @r###"
        #define LLRTSP_VERSION_MAJOR 2
        #define LLRTSP_VERSION_MINOR 5
        #define LLRTSP_VERSION_PATCH 10
        "###);
    }
}
