//! Module graph resolution.
//!
//! A [`Container`] holds every candidate module of one resolution attempt as
//! an installed [`ModuleRevision`], the system module first. Resolving it
//! computes a [`Wiring`] for each revision that can be resolved and records
//! the [`UnmetRequirement`]s of each one that cannot.
//!
//! # Architecture
//!
//! - [`Container`]: revision arena with lookup by name and location
//! - [`Policy`]: deterministic candidate preference
//! - [`BatchExecutor`]: batched worker pool with a timeout fallback
//! - [`ResolveSettings`]: knobs and retry counters of one attempt
//! - [`ResolutionReport`]: two-tier failure diagnostics
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use wirex_resolver::container::{Container, ModuleOrigin, ResolveSettings, RuntimeEnvironment, SystemCapabilities};
//! use wirex_resolver::descriptor::{ModuleDescriptor, PackageExport, PackageImport};
//! use wirex_version::Version;
//!
//! let system = ModuleDescriptor::new("system.bundle", Version::empty());
//! let mut container = Container::new(
//!     RuntimeEnvironment::new("linux", "gtk", "x86_64", "en_US"),
//!     SystemCapabilities::default(),
//!     Arc::new(system),
//!     None,
//! );
//! let api = container.install(
//!     Arc::new(ModuleDescriptor::new("api", Version::new(1, 0, 0)).with_export(PackageExport::new("org.api"))),
//!     None,
//!     ModuleOrigin::External,
//! );
//! let app = container.install(
//!     Arc::new(ModuleDescriptor::new("app", Version::new(1, 0, 0)).with_import(PackageImport::new("org.api"))),
//!     None,
//!     ModuleOrigin::Reactor,
//! );
//!
//! container.resolve(&ResolveSettings::default(), Some(app));
//! assert!(container.is_resolved(app));
//! assert_eq!(container.wiring(app).unwrap().packages[0].provider, api);
//! ```

mod batch;
mod container;
mod environment;
mod policy;
mod report;
mod resolve;
mod uses;
mod wiring;


pub use batch::BatchExecutor;
pub use container::{Container, ModuleOrigin, ModuleRevision, RevisionId, RevisionState, SYSTEM_MODULE_NAME};
pub use environment::{builtin_profiles, ExecutionProfile, RuntimeEnvironment, SystemCapabilities};
pub use policy::Policy;
pub use report::{RejectedCandidate, RejectionReason, RequirementKind, ResolutionReport, UnmetRequirement};
pub use resolve::ResolveSettings;
pub use wiring::{ExportedPackage, ModuleWire, PackageWire, Wiring};
