//! Classpath visibility computation.
//!
//! Given a resolved [`Container`](crate::container::Container), the
//! [`DependencyComputer`] walks one module's wiring and produces the ordered
//! [`DependencyEntry`] list the module compiles against, each entry tagged
//! with the [`AccessRule`]s that say which packages are accessible and which
//! are discouraged.

mod access;
mod computer;
mod entry;
mod visible;


pub use access::AccessRule;
pub use computer::DependencyComputer;
pub use entry::{DependencyEntry, EntryKind};
pub use visible::VisiblePackages;
