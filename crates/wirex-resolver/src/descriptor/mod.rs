// Module descriptor model
//
// This module provides the typed, immutable view of a module's declared
// capabilities and requirements, the on-disk form it is read from, and the
// platform filter attached to platform-specific modules.

mod convert;
mod descriptor;
mod filter;

pub use convert::{RawDescriptor, RawExport, RawHost, RawImport, RawRequire};
pub use descriptor::{
    ExtensionKind, FragmentHost, ModuleDescriptor, PackageExport, PackageImport, RequiredModule,
};
pub use filter::PlatformFilter;

use std::path::PathBuf;

use thiserror::Error;
use wirex_version::VersionError;

/// Errors raised while turning raw descriptor content into a [`ModuleDescriptor`].
///
/// These are build-input errors: they are never retried.
#[derive(Debug, Error)]
pub enum DescriptorError {
    #[error("{location}: mandatory field '{field}' not found")]
    MissingField { location: PathBuf, field: &'static str },

    #[error("{location}: {field} '{value}' is invalid: {source}")]
    InvalidVersion {
        location: PathBuf,
        field: String,
        value: String,
        #[source]
        source: VersionError,
    },

    #[error("{location}: invalid platform filter '{filter}': {reason}")]
    InvalidFilter {
        location: PathBuf,
        filter: String,
        reason: String,
    },

    #[error("{location}: unknown fragment extension '{value}'")]
    UnknownExtension { location: PathBuf, value: String },

    #[error("{location}: malformed descriptor: {source}")]
    Malformed {
        location: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{location}: descriptor not found ({entry})")]
    NotFound { location: PathBuf, entry: String },
}
