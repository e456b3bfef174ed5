/// Task output cache
///
/// One file per task (`<cache_dir>/<name>.cache`) holding the raw combined
/// output of its most recent execution. Entries carry no timestamp of their
/// own; freshness is decided from the task definition.
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::is_path_safe_task_name;
use crate::logging::{operations, services, status};

const CACHE_FILE_EXTENSION: &str = "cache";

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("No cached output for task '{0}'")]
    Miss(String),

    #[error("Task name '{0}' cannot be used as a cache file name")]
    InvalidName(String),

    #[error("Cache I/O failed for {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// File-backed store of captured task output
#[derive(Debug, Clone)]
pub struct CacheStore {
    cache_dir: PathBuf,
}

impl CacheStore {
    /// The directory is created on first write, not here.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Path of the cache file for `name`.
    ///
    /// Names that would resolve outside the cache directory are refused.
    pub fn entry_path(&self, name: &str) -> Result<PathBuf, CacheError> {
        if !is_path_safe_task_name(name) {
            return Err(CacheError::InvalidName(name.to_string()));
        }
        Ok(self
            .cache_dir
            .join(format!("{}.{}", name, CACHE_FILE_EXTENSION)))
    }

    /// Persist `payload` for `name` byte for byte, replacing any previous entry.
    pub fn write(&self, name: &str, payload: &[u8]) -> Result<(), CacheError> {
        let path = self.entry_path(name)?;
        fs::create_dir_all(&self.cache_dir).map_err(|source| CacheError::Io {
            path: self.cache_dir.clone(),
            source,
        })?;

        fs::write(&path, payload).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;

        debug!(
            service = services::TASK_CACHE,
            operation = operations::WRITE,
            status = status::SUCCESS,
            task = %name,
            size_bytes = payload.len(),
            path = %path.display(),
            "cached task output"
        );

        Ok(())
    }

    /// Read the cached payload for `name`.
    ///
    /// Returns [`CacheError::Miss`] if the entry was never written or has
    /// been removed.
    pub fn read(&self, name: &str) -> Result<Vec<u8>, CacheError> {
        let path = self.entry_path(name)?;

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                info!(
                    service = services::TASK_CACHE,
                    operation = operations::READ,
                    status = status::MISS,
                    task = %name,
                    "cache miss"
                );
                return Err(CacheError::Miss(name.to_string()));
            }
            Err(source) => return Err(CacheError::Io { path, source }),
        };

        debug!(
            service = services::TASK_CACHE,
            operation = operations::READ,
            status = status::HIT,
            task = %name,
            size_bytes = bytes.len(),
            "cache hit"
        );

        Ok(bytes)
    }

    /// Remove the entry for `name`. Missing entries are ignored.
    pub fn remove(&self, name: &str) -> Result<bool, CacheError> {
        let path = self.entry_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(
                    service = services::TASK_CACHE,
                    operation = operations::REMOVE,
                    status = status::SUCCESS,
                    task = %name,
                    "removed cache entry"
                );
                Ok(true)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(source) => Err(CacheError::Io { path, source }),
        }
    }

    /// Names of all cached tasks, sorted
    pub fn list(&self) -> Result<Vec<String>, CacheError> {
        let mut entries = Vec::new();

        let read_dir = match fs::read_dir(&self.cache_dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(entries),
            Err(source) => {
                return Err(CacheError::Io {
                    path: self.cache_dir.clone(),
                    source,
                })
            }
        };

        for entry in read_dir {
            let entry = entry.map_err(|source| CacheError::Io {
                path: self.cache_dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(CACHE_FILE_EXTENSION) {
                continue;
            }
            match path.file_stem().and_then(|stem| stem.to_str()) {
                Some(stem) if is_path_safe_task_name(stem) => entries.push(stem.to_string()),
                _ => continue,
            }
        }

        entries.sort();
        Ok(entries)
    }

    /// Remove every cache entry, returning how many were deleted.
    pub fn clean_all(&self) -> Result<usize, CacheError> {
        let names = self.list()?;
        for name in &names {
            self.remove(name)?;
        }
        Ok(names.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_then_read() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::new(temp.path().join("cache"));

        cache.write("build-status", b"status:ok\n").unwrap();
        assert_eq!(cache.read("build-status").unwrap(), b"status:ok\n");
        assert!(temp.path().join("cache/build-status.cache").exists());
    }

    #[test]
    fn test_write_replaces_previous_value() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::new(temp.path());

        cache.write("a", b"first").unwrap();
        cache.write("a", b"second").unwrap();
        assert_eq!(cache.read("a").unwrap(), b"second");
    }

    #[test]
    fn test_read_missing_is_miss() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::new(temp.path().join("never-created"));

        let err = cache.read("nothing").unwrap_err();
        assert!(matches!(err, CacheError::Miss(name) if name == "nothing"));
        assert!(!temp.path().join("never-created").exists());
    }

    #[test]
    fn test_externally_removed_entry_is_miss() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::new(temp.path());

        cache.write("a", b"payload").unwrap();
        fs::remove_file(cache.entry_path("a").unwrap()).unwrap();
        assert!(matches!(cache.read("a"), Err(CacheError::Miss(_))));
    }

    #[test]
    fn test_write_is_idempotent_about_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("nested/cache");
        fs::create_dir_all(&dir).unwrap();
        let cache = CacheStore::new(&dir);

        cache.write("a", b"x").unwrap();
        cache.write("b", b"y").unwrap();
        assert_eq!(cache.list().unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn test_remove_and_clean_all() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::new(temp.path());

        cache.write("a", b"x").unwrap();
        cache.write("b", b"y").unwrap();
        cache.write("c", b"z").unwrap();
        fs::write(temp.path().join("unrelated.txt"), "keep me").unwrap();

        assert!(cache.remove("a").unwrap());
        assert!(!cache.remove("a").unwrap());
        assert_eq!(cache.list().unwrap(), vec!["b", "c"]);

        assert_eq!(cache.clean_all().unwrap(), 2);
        assert!(cache.list().unwrap().is_empty());
        assert!(temp.path().join("unrelated.txt").exists());
    }

    #[test]
    fn test_payload_is_stored_byte_for_byte() {
        let temp = TempDir::new().unwrap();
        let cache = CacheStore::new(temp.path());

        // Latin-1 "café" is not valid UTF-8
        let payload = b"caf\xe9\n\x00\xff";
        cache.write("raw", payload).unwrap();

        assert_eq!(fs::read(temp.path().join("raw.cache")).unwrap(), payload);
        assert_eq!(cache.read("raw").unwrap(), payload);
    }

    #[test]
    fn test_names_escaping_the_directory_are_refused() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("cache");
        let cache = CacheStore::new(&dir);
        fs::create_dir_all(&dir).unwrap();
        fs::write(temp.path().join("outside.cache"), "keep").unwrap();

        for name in ["../outside", "a/b", ".hidden", ""] {
            assert!(matches!(
                cache.write(name, b"x"),
                Err(CacheError::InvalidName(_))
            ));
            assert!(matches!(cache.read(name), Err(CacheError::InvalidName(_))));
            assert!(matches!(
                cache.remove(name),
                Err(CacheError::InvalidName(_))
            ));
        }

        assert!(temp.path().join("outside.cache").exists());
        assert!(cache.list().unwrap().is_empty());
    }
}
