use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::debug;
use walkdir::WalkDir;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::descriptor::{DescriptorError, ModuleDescriptor, RawDescriptor};
use crate::error::{ResolverError, Result};

use super::DescriptorCache;

/// Descriptor file inside a module directory
pub const DESCRIPTOR_FILE: &str = "module.json";

/// Descriptor entry inside a module archive
pub const ARCHIVE_DESCRIPTOR_ENTRY: &str = "META-INF/module.json";

/// Reads module descriptors from disk through a [`DescriptorCache`].
///
/// A module location is one of:
/// - a directory containing `module.json`
/// - a bare `*.json` descriptor file
/// - a `*.jar` or `*.zip` archive containing `META-INF/module.json`
#[derive(Debug, Clone)]
pub struct DescriptorReader {
    cache: Arc<DescriptorCache>,
    existence_timeout: Duration,
}

impl DescriptorReader {
    /// Create a reader backed by the process-wide cache
    pub fn new(existence_timeout: Duration) -> Self {
        Self::with_cache(DescriptorCache::global(), existence_timeout)
    }

    pub fn with_cache(cache: Arc<DescriptorCache>, existence_timeout: Duration) -> Self {
        Self {
            cache,
            existence_timeout,
        }
    }

    pub fn cache(&self) -> &Arc<DescriptorCache> {
        &self.cache
    }

    /// Load the descriptor of the module at `location`
    pub fn load(&self, location: &Path) -> Result<Arc<ModuleDescriptor>> {
        self.cache.get_or_try_insert(location, || self.read(location))
    }

    fn read(&self, location: &Path) -> Result<ModuleDescriptor> {
        self.wait_for_existence(location)?;
        debug!("Reading module descriptor from {}", location.display());

        let data = if location.is_dir() {
            let file = location.join(DESCRIPTOR_FILE);
            self.wait_for_existence(&file)?;
            read_file(&file)?
        } else {
            match extension(location).as_deref() {
                Some("json") => read_file(location)?,
                Some("jar") | Some("zip") => read_archive(location)?,
                _ => {
                    return Err(DescriptorError::NotFound {
                        location: location.to_path_buf(),
                        entry: DESCRIPTOR_FILE.to_string(),
                    }
                    .into())
                }
            }
        };

        let raw = RawDescriptor::from_slice(&data, location)?;
        Ok(ModuleDescriptor::from_raw(raw, location)?)
    }

    /// Poll until `path` exists or the existence timeout elapses.
    ///
    /// Content written by another process may become visible with a delay.
    pub fn wait_for_existence(&self, path: &Path) -> Result<()> {
        let start = Instant::now();
        while !path.exists() {
            if start.elapsed() >= self.existence_timeout {
                return Err(ResolverError::ContentUnavailable {
                    location: path.to_path_buf(),
                    waited: self.existence_timeout,
                });
            }
            thread::yield_now();
        }
        Ok(())
    }

    /// Find every module location below `dir`, sorted by path.
    ///
    /// Directories holding a descriptor are not descended into.
    pub fn discover(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        let mut walker = WalkDir::new(dir).sort_by_file_name().into_iter();

        while let Some(entry) = walker.next() {
            let entry = entry.map_err(|e| ResolverError::Io {
                location: dir.to_path_buf(),
                source: io::Error::from(e),
            })?;
            let path = entry.path();

            if entry.file_type().is_dir() {
                if path.join(DESCRIPTOR_FILE).is_file() {
                    found.push(path.to_path_buf());
                    walker.skip_current_dir();
                }
            } else if matches!(extension(path).as_deref(), Some("jar") | Some("zip")) {
                found.push(path.to_path_buf());
            }
        }

        debug!("Discovered {} modules under {}", found.len(), dir.display());
        Ok(found)
    }
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| ResolverError::Io {
        location: path.to_path_buf(),
        source,
    })
}

fn read_archive(path: &Path) -> Result<Vec<u8>> {
    let archive_error = |source| ResolverError::Archive {
        location: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|source| ResolverError::Io {
        location: path.to_path_buf(),
        source,
    })?;
    let mut archive = ZipArchive::new(file).map_err(archive_error)?;
    let mut entry = match archive.by_name(ARCHIVE_DESCRIPTOR_ENTRY) {
        Ok(entry) => entry,
        Err(ZipError::FileNotFound) => {
            return Err(DescriptorError::NotFound {
                location: path.to_path_buf(),
                entry: ARCHIVE_DESCRIPTOR_ENTRY.to_string(),
            }
            .into())
        }
        Err(e) => return Err(archive_error(e)),
    };

    let mut data = Vec::new();
    entry.read_to_end(&mut data).map_err(|source| ResolverError::Io {
        location: path.to_path_buf(),
        source,
    })?;
    Ok(data)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;
    use zip::ZipWriter;

    use super::*;

    const DESCRIPTOR: &str = r#"{"symbolic-name": "org.example", "version": "1.0.0"}"#;

    fn reader() -> DescriptorReader {
        DescriptorReader::with_cache(Arc::new(DescriptorCache::new()), Duration::from_millis(50))
    }

    fn write_jar(path: &Path, entry: &str, content: &str) {
        let file = File::create(path).unwrap();
        let mut zip = ZipWriter::new(file);
        zip.start_file(entry, SimpleFileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
        zip.finish().unwrap();
    }

    #[test]
    fn test_load_directory_module() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(DESCRIPTOR_FILE), DESCRIPTOR).unwrap();

        let descriptor = reader().load(dir.path()).unwrap();
        assert_eq!(descriptor.symbolic_name, "org.example");
    }

    #[test]
    fn test_load_bare_json_and_archive() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("a.json");
        fs::write(&json, DESCRIPTOR).unwrap();
        let jar = dir.path().join("b.jar");
        write_jar(&jar, ARCHIVE_DESCRIPTOR_ENTRY, DESCRIPTOR);

        let reader = reader();
        assert_eq!(reader.load(&json).unwrap().identity(), "org.example_1.0.0");
        assert_eq!(reader.load(&jar).unwrap().identity(), "org.example_1.0.0");
    }

    #[test]
    fn test_archive_without_descriptor() {
        let dir = TempDir::new().unwrap();
        let jar = dir.path().join("empty.jar");
        write_jar(&jar, "other.txt", "hello");

        let err = reader().load(&jar).unwrap_err();
        assert!(matches!(
            err,
            ResolverError::InvalidDescriptor(DescriptorError::NotFound { .. })
        ));
    }

    #[test]
    fn test_missing_location_times_out() {
        let dir = TempDir::new().unwrap();
        let err = reader().load(&dir.path().join("never")).unwrap_err();
        assert!(matches!(err, ResolverError::ContentUnavailable { .. }));
    }

    #[test]
    fn test_invalid_descriptor_is_not_cached() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("m.json");
        fs::write(&json, r#"{"version": "1"}"#).unwrap();

        let reader = reader();
        assert!(matches!(
            reader.load(&json).unwrap_err(),
            ResolverError::InvalidDescriptor(DescriptorError::MissingField { .. })
        ));
        assert!(reader.cache().is_empty());

        fs::write(&json, DESCRIPTOR).unwrap();
        assert!(reader.load(&json).is_ok());
    }

    #[test]
    fn test_discover() {
        let dir = TempDir::new().unwrap();
        let module = dir.path().join("mod-a");
        fs::create_dir_all(module.join("nested")).unwrap();
        fs::write(module.join(DESCRIPTOR_FILE), DESCRIPTOR).unwrap();
        fs::write(module.join("nested").join(DESCRIPTOR_FILE), DESCRIPTOR).unwrap();
        write_jar(&dir.path().join("lib.jar"), ARCHIVE_DESCRIPTOR_ENTRY, DESCRIPTOR);
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let found = reader().discover(dir.path()).unwrap();
        assert_eq!(found, vec![dir.path().join("lib.jar"), module]);
    }
}
