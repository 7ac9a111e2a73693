use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::container::ResolutionReport;
use crate::descriptor::DescriptorError;

/// Errors surfaced by descriptor loading, graph resolution and the visibility walk.
#[derive(Debug, Error)]
pub enum ResolverError {
    /// Malformed module descriptor; never retried
    #[error(transparent)]
    InvalidDescriptor(#[from] DescriptorError),

    /// The module's backing content did not appear before the poll deadline
    #[error("module content not available at {location} after {waited:?}")]
    ContentUnavailable { location: PathBuf, waited: Duration },

    #[error("failed to read module content at {location}: {source}")]
    Io {
        location: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read module archive {location}: {source}")]
    Archive {
        location: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("module at {0} is not part of the module set")]
    UnknownModule(PathBuf),

    #[error("unknown execution profile '{0}'")]
    UnknownProfile(String),

    /// Constraint-unsatisfiable resolution of the target module
    #[error("{}", .0.summary())]
    Unresolved(Box<ResolutionReport>),

    /// Caller contract violation, e.g. walking an unresolved revision
    #[error("internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ResolverError>;
