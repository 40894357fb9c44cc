//! File-backed key-value store
//!
//! Each key maps to `<dir>/<key>.json`. Writes go to a temp file which is
//! then renamed over the target, so a crash leaves either the old or the new
//! blob on disk, never a torn one. The directory is fsynced after the rename
//! and after a removal, so the new entry survives power loss too.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::{KeyValueStore, StorageError, StorageResult};

/// Directory of JSON blobs, one per key
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create the store, creating `dir` if needed
    pub fn new(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Directory holding the blobs
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let safe: String = key
            .chars()
            .map(|c| match c {
                '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
                c => c,
            })
            .collect();
        self.dir.join(format!("{safe}.json"))
    }

    /// Flush directory entries (renames, unlinks) to disk
    fn sync_dir(&self) -> StorageResult<()> {
        sync_dir(&self.dir)
    }
}

#[cfg(unix)]
fn sync_dir(dir: &Path) -> StorageResult<()> {
    File::open(dir)
        .and_then(|d| d.sync_all())
        .map_err(|e| StorageError::io(dir, e))
}

// No directory fsync off unix
#[cfg(not(unix))]
fn sync_dir(_dir: &Path) -> StorageResult<()> {
    Ok(())
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StorageResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        let temp_path = path.with_extension("json.tmp");

        let mut file = File::create(&temp_path).map_err(|e| StorageError::io(&temp_path, e))?;
        file.write_all(value.as_bytes())
            .and_then(|_| file.sync_all())
            .map_err(|e| StorageError::io(&temp_path, e))?;

        // Atomic rename
        fs::rename(&temp_path, &path).map_err(|e| StorageError::io(&path, e))?;
        self.sync_dir()?;

        tracing::trace!(path = %path.display(), bytes = value.len(), "Blob written");
        Ok(())
    }

    fn remove(&self, key: &str) -> StorageResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => self.sync_dir(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(&path, e)),
        }
    }
}
