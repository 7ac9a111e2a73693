//! Module versions and version ranges.
//!
//! Versions follow the `major.minor.micro.qualifier` scheme: missing numeric
//! segments default to zero and the qualifier is compared lexicographically.
//! Ranges are written in interval notation (`[1.0,2.0)`, `(1,2]`) or as a bare
//! version, which means "this version or anything newer".
//!
//! # Example
//!
//! ```
//! use wirex_version::{Version, VersionRange};
//!
//! let range: VersionRange = "[1.2,2)".parse().unwrap();
//! assert!(range.includes(&Version::parse("1.9.3.v2024").unwrap()));
//! assert!(!range.includes(&Version::new(2, 0, 0)));
//! ```

mod range;
mod version;

use thiserror::Error;

pub use range::VersionRange;
pub use version::Version;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VersionError {
    #[error("Invalid version \"{0}\"")]
    InvalidVersion(String),

    #[error("Invalid version range \"{range}\": {reason}")]
    InvalidRange { range: String, reason: String },
}
