use std::fmt;
use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;

use crate::VersionError;

lazy_static! {
    static ref VERSION_REGEX: Regex =
        Regex::new(r"^(\d+)(?:\.(\d+)(?:\.(\d+)(?:\.([A-Za-z0-9_-]+))?)?)?$").unwrap();
}

/// A module version (`major.minor.micro.qualifier`).
///
/// Ordering compares the numeric segments first and the qualifier last, so
/// `1.0.0` < `1.0.0.beta` < `1.0.1`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Version {
    major: u32,
    minor: u32,
    micro: u32,
    qualifier: String,
}

impl Version {
    /// Create a version without qualifier
    pub fn new(major: u32, minor: u32, micro: u32) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: String::new(),
        }
    }

    /// Create a version with a qualifier
    pub fn with_qualifier(major: u32, minor: u32, micro: u32, qualifier: impl Into<String>) -> Self {
        Self {
            major,
            minor,
            micro,
            qualifier: qualifier.into(),
        }
    }

    /// The empty version `0.0.0`
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a version string.
    ///
    /// Surrounding whitespace is ignored and an empty string yields `0.0.0`.
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Ok(Self::empty());
        }

        let caps = VERSION_REGEX
            .captures(trimmed)
            .ok_or_else(|| VersionError::InvalidVersion(input.to_string()))?;

        let segment = |index: usize| -> Result<u32, VersionError> {
            match caps.get(index) {
                Some(m) => m
                    .as_str()
                    .parse()
                    .map_err(|_| VersionError::InvalidVersion(input.to_string())),
                None => Ok(0),
            }
        };

        Ok(Self {
            major: segment(1)?,
            minor: segment(2)?,
            micro: segment(3)?,
            qualifier: caps.get(4).map(|m| m.as_str().to_string()).unwrap_or_default(),
        })
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn micro(&self) -> u32 {
        self.micro
    }

    pub fn qualifier(&self) -> &str {
        &self.qualifier
    }
}

impl FromStr for Version {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Version::parse(s)
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.micro)?;
        if !self.qualifier.is_empty() {
            write!(f, ".{}", self.qualifier)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_partial_versions() {
        assert_eq!(Version::parse("1").unwrap(), Version::new(1, 0, 0));
        assert_eq!(Version::parse("1.2").unwrap(), Version::new(1, 2, 0));
        assert_eq!(Version::parse("1.2.3").unwrap(), Version::new(1, 2, 3));
        assert_eq!(
            Version::parse("1.2.3.v20240101").unwrap(),
            Version::with_qualifier(1, 2, 3, "v20240101")
        );
    }

    #[test]
    fn test_parse_empty_is_zero() {
        assert_eq!(Version::parse("").unwrap(), Version::empty());
        assert_eq!(Version::parse("  ").unwrap(), Version::empty());
    }

    #[test]
    fn test_parse_invalid() {
        assert!(Version::parse("1.x").is_err());
        assert!(Version::parse("1.2.3.4.5").is_err());
        assert!(Version::parse("abc").is_err());
        assert!(Version::parse("1.2.3.qual ifier").is_err());
    }

    #[test]
    fn test_ordering() {
        let v = |s: &str| Version::parse(s).unwrap();
        assert!(v("1.0.0") < v("1.0.1"));
        assert!(v("1.10.0") > v("1.9.0"));
        assert!(v("1.0.0") < v("1.0.0.beta"));
        assert!(v("1.0.0.alpha") < v("1.0.0.beta"));
        assert!(v("1.0.0.zzz") < v("1.0.1"));
        assert_eq!(v("2"), v("2.0.0"));
    }

    #[test]
    fn test_display() {
        assert_eq!(Version::parse("1.2").unwrap().to_string(), "1.2.0");
        assert_eq!(Version::parse("3.1.4.qualifier").unwrap().to_string(), "3.1.4.qualifier");
    }
}
