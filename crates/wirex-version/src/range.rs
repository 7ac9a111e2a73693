//! Version range implementation

use std::fmt;
use std::str::FromStr;

use crate::{Version, VersionError};

/// A range of versions with inclusive or exclusive bounds.
///
/// An absent maximum means the range is unbounded above.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionRange {
    min: Version,
    min_inclusive: bool,
    max: Option<Version>,
    max_inclusive: bool,
}

impl VersionRange {
    /// The range matching every version (`0.0.0` and up)
    pub fn any() -> Self {
        Self::at_least(Version::empty())
    }

    /// The range matching `version` and everything newer
    pub fn at_least(version: Version) -> Self {
        Self {
            min: version,
            min_inclusive: true,
            max: None,
            max_inclusive: false,
        }
    }

    /// The range matching exactly one version (`[v,v]`)
    pub fn exact(version: Version) -> Self {
        Self {
            min: version.clone(),
            min_inclusive: true,
            max: Some(version),
            max_inclusive: true,
        }
    }

    /// Create a bounded range
    pub fn between(min: Version, min_inclusive: bool, max: Version, max_inclusive: bool) -> Self {
        Self {
            min,
            min_inclusive,
            max: Some(max),
            max_inclusive,
        }
    }

    /// Parse a range.
    ///
    /// Accepts interval notation (`[1.0,2.0)`), a bare version (at least), or
    /// an empty string / `*` (any version).
    pub fn parse(input: &str) -> Result<Self, VersionError> {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "*" {
            return Ok(Self::any());
        }

        let first = trimmed.chars().next().unwrap_or_default();
        if first != '[' && first != '(' {
            let version = Version::parse(trimmed).map_err(|_| invalid(input, "invalid version"))?;
            return Ok(Self::at_least(version));
        }

        let last = trimmed.chars().last().unwrap_or_default();
        if last != ']' && last != ')' {
            return Err(invalid(input, "missing closing bracket"));
        }

        let inner = &trimmed[1..trimmed.len() - 1];
        let (low, high) = inner
            .split_once(',')
            .ok_or_else(|| invalid(input, "expected two comma separated versions"))?;

        let min = Version::parse(low).map_err(|_| invalid(input, "invalid lower bound"))?;
        let max = Version::parse(high).map_err(|_| invalid(input, "invalid upper bound"))?;
        if high.trim().is_empty() {
            return Err(invalid(input, "missing upper bound"));
        }
        if max < min {
            return Err(invalid(input, "upper bound is lower than lower bound"));
        }

        Ok(Self {
            min,
            min_inclusive: first == '[',
            max: Some(max),
            max_inclusive: last == ']',
        })
    }

    /// Check whether a version lies within this range
    pub fn includes(&self, version: &Version) -> bool {
        let above_min = if self.min_inclusive {
            *version >= self.min
        } else {
            *version > self.min
        };
        if !above_min {
            return false;
        }

        match &self.max {
            Some(max) if self.max_inclusive => version <= max,
            Some(max) => version < max,
            None => true,
        }
    }

    /// Check whether this range can only ever match a single version
    pub fn is_exact(&self) -> bool {
        matches!(&self.max, Some(max) if self.min_inclusive && self.max_inclusive && *max == self.min)
    }

    /// Check whether this range matches every version
    pub fn is_any(&self) -> bool {
        self.max.is_none() && self.min_inclusive && self.min == Version::empty()
    }

    pub fn min(&self) -> &Version {
        &self.min
    }

    pub fn max(&self) -> Option<&Version> {
        self.max.as_ref()
    }
}

impl Default for VersionRange {
    fn default() -> Self {
        Self::any()
    }
}

impl FromStr for VersionRange {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VersionRange::parse(s)
    }
}

impl fmt::Display for VersionRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.max {
            None if self.min_inclusive => write!(f, "{}", self.min),
            None => write!(f, "({},)", self.min),
            Some(max) => write!(
                f,
                "{}{},{}{}",
                if self.min_inclusive { '[' } else { '(' },
                self.min,
                max,
                if self.max_inclusive { ']' } else { ')' }
            ),
        }
    }
}

fn invalid(range: &str, reason: &str) -> VersionError {
    VersionError::InvalidRange {
        range: range.to_string(),
        reason: reason.to_string(),
    }
}
