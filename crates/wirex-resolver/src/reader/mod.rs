// Descriptor loading
//
// Module locations on disk are turned into shared `ModuleDescriptor`s once
// per absolute location and kept in a process-wide cache.

mod cache;
mod reader;

pub use cache::DescriptorCache;
pub use reader::{DescriptorReader, ARCHIVE_DESCRIPTOR_ENTRY, DESCRIPTOR_FILE};
