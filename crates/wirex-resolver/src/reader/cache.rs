use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use lazy_static::lazy_static;
use log::trace;

use crate::descriptor::ModuleDescriptor;
use crate::error::Result;

lazy_static! {
    static ref GLOBAL: Arc<DescriptorCache> = Arc::new(DescriptorCache::new());
}

/// Descriptors keyed by absolute module location.
///
/// Reads are concurrent; the first successful load of a location wins and
/// later loads of the same key return the stored descriptor. Failed loads
/// are never stored. Entries live until [`clear`](Self::clear).
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: RwLock<HashMap<PathBuf, Arc<ModuleDescriptor>>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache
    pub fn global() -> Arc<DescriptorCache> {
        Arc::clone(&GLOBAL)
    }

    pub fn get(&self, location: &Path) -> Option<Arc<ModuleDescriptor>> {
        let key = cache_key(location);
        match self.entries.read() {
            Ok(entries) => entries.get(&key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(&key).cloned(),
        }
    }

    /// Return the cached descriptor for `location`, loading it with `load`
    /// on a miss.
    ///
    /// When two callers race on the same key both may load, but only the
    /// first insertion is kept and both receive it.
    pub fn get_or_try_insert<F>(&self, location: &Path, load: F) -> Result<Arc<ModuleDescriptor>>
    where
        F: FnOnce() -> Result<ModuleDescriptor>,
    {
        if let Some(descriptor) = self.get(location) {
            return Ok(descriptor);
        }

        let loaded = Arc::new(load()?);
        let key = cache_key(location);
        let mut entries = match self.entries.write() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        trace!("Caching descriptor of {}", key.display());
        Ok(Arc::clone(entries.entry(key).or_insert(loaded)))
    }

    /// Drop every cached descriptor
    pub fn clear(&self) {
        match self.entries.write() {
            Ok(mut entries) => entries.clear(),
            Err(poisoned) => poisoned.into_inner().clear(),
        }
    }

    pub fn len(&self) -> usize {
        match self.entries.read() {
            Ok(entries) => entries.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cache_key(location: &Path) -> PathBuf {
    std::path::absolute(location).unwrap_or_else(|_| location.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ResolverError;
    use wirex_version::Version;

    fn descriptor(name: &str) -> ModuleDescriptor {
        ModuleDescriptor::new(name, Version::new(1, 0, 0))
    }

    #[test]
    fn test_first_insertion_wins() {
        let cache = DescriptorCache::new();
        let first = cache.get_or_try_insert(Path::new("/m/a"), || Ok(descriptor("a"))).unwrap();
        let second = cache.get_or_try_insert(Path::new("/m/a"), || Ok(descriptor("other"))).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.symbolic_name, "a");
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_errors_are_not_cached() {
        let cache = DescriptorCache::new();
        let err = cache.get_or_try_insert(Path::new("/m/b"), || Err(ResolverError::Internal("boom".to_string())));
        assert!(err.is_err());
        assert!(cache.is_empty());

        let loaded = cache.get_or_try_insert(Path::new("/m/b"), || Ok(descriptor("b"))).unwrap();
        assert_eq!(loaded.symbolic_name, "b");
    }

    #[test]
    fn test_relative_and_absolute_keys_match() {
        let cache = DescriptorCache::new();
        let absolute = std::path::absolute("rel/module").unwrap();
        cache.get_or_try_insert(Path::new("rel/module"), || Ok(descriptor("r"))).unwrap();
        assert!(cache.get(&absolute).is_some());
    }

    #[test]
    fn test_clear() {
        let cache = DescriptorCache::new();
        cache.get_or_try_insert(Path::new("/m/c"), || Ok(descriptor("c"))).unwrap();
        cache.clear();
        assert!(cache.get(Path::new("/m/c")).is_none());
    }
}
