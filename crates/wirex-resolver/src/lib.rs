//! Module graph resolution and classpath visibility computation.
//!
//! Resolves a module under build against the modules it may depend on and a
//! system module standing for the base runtime, then walks the resulting
//! wiring to compute the ordered classpath the module compiles against,
//! with package-level access rules.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use wirex_resolver::descriptor::{ModuleDescriptor, PackageExport, PackageImport};
//! use wirex_resolver::{ModuleInput, ModuleResolver, ResolverConfig};
//! use wirex_version::Version;
//!
//! let api = ModuleDescriptor::new("api", Version::new(1, 0, 0)).with_export(PackageExport::new("org.api"));
//! let app = ModuleDescriptor::new("app", Version::new(1, 0, 0)).with_import(PackageImport::new("org.api"));
//!
//! let resolver = ModuleResolver::new(ResolverConfig::default());
//! let resolution = resolver
//!     .resolve(
//!         &ModuleInput::reactor(Arc::new(app), "/workspace/app"),
//!         &[ModuleInput::external(Arc::new(api), Some("/platform/api.jar".into()))],
//!     )
//!     .unwrap();
//!
//! let classpath = resolution.classpath().unwrap();
//! assert_eq!(classpath[0].location.to_str(), Some("/platform/api.jar"));
//! ```

pub mod classpath;
pub mod config;
pub mod container;
pub mod descriptor;
pub mod error;
pub mod reader;
pub mod resolver;
pub mod visibility;

pub use classpath::ClasspathEntry;
pub use config::ResolverConfig;
pub use container::{Container, ResolutionReport, ResolveSettings, RevisionId};
pub use descriptor::{DescriptorError, ModuleDescriptor};
pub use error::{ResolverError, Result};
pub use reader::{DescriptorCache, DescriptorReader};
pub use resolver::{ModuleInput, ModuleResolver, Resolution};
pub use visibility::{AccessRule, DependencyComputer, DependencyEntry};
