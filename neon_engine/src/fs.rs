/// File system access used by the shader processor and cache store

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{Error, Result};

/// File system collaborator
///
/// Shader sources and cached binaries are read and written through this
/// trait so the shader pipeline can run against disk or memory.
pub trait FileSystem: Send + Sync {
    /// Whether a file exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Read a whole file, `Error::NotFound` when it does not exist
    fn read_all(&self, path: &Path) -> Result<Vec<u8>>;

    /// Create or truncate `path` and write `data`
    fn write_all(&self, path: &Path, data: &[u8]) -> Result<()>;

    /// Remove a file; removing a missing file succeeds
    fn remove(&self, path: &Path) -> Result<()>;

    /// Create a directory and all of its parents
    fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read a whole file as UTF-8 text
    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read_all(path)?;
        String::from_utf8(bytes).map_err(|e| {
            Error::InvalidResource(format!("{} is not valid UTF-8: {}", path.display(), e))
        })
    }
}

/// Disk-backed file system
#[derive(Debug, Default, Clone, Copy)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        std::fs::read(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(path.to_path_buf()),
            _ => Error::InvalidResource(format!("Failed to read {}: {}", path.display(), e)),
        })
    }

    fn write_all(&self, path: &Path, data: &[u8]) -> Result<()> {
        std::fs::write(path, data)
            .map_err(|e| Error::InvalidResource(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn remove(&self, path: &Path) -> Result<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::InvalidResource(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        std::fs::create_dir_all(path).map_err(|e| {
            Error::InvalidResource(format!("Failed to create directory {}: {}", path.display(), e))
        })
    }
}

/// In-memory file system
///
/// Useful for tools and tests that must not touch the disk. Paths are
/// compared verbatim, no normalization is applied.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    files: Mutex<FxHashMap<PathBuf, Vec<u8>>>,
    dirs: Mutex<FxHashSet<PathBuf>>,
}

impl MemoryFileSystem {
    /// Create an empty file system
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a file, replacing any previous content
    pub fn insert(&self, path: impl Into<PathBuf>, data: impl Into<Vec<u8>>) {
        if let Ok(mut files) = self.files.lock() {
            files.insert(path.into(), data.into());
        }
    }

    /// Whether `create_dir_all` was called for `path`
    pub fn has_dir(&self, path: &Path) -> bool {
        self.dirs.lock().map(|dirs| dirs.contains(path)).unwrap_or(false)
    }

    /// Number of stored files
    pub fn file_count(&self) -> usize {
        self.files.lock().map(|files| files.len()).unwrap_or(0)
    }

    fn poisoned() -> Error {
        Error::InvalidResource("memory file system lock poisoned".to_string())
    }
}

impl FileSystem for MemoryFileSystem {
    fn exists(&self, path: &Path) -> bool {
        self.files.lock().map(|files| files.contains_key(path)).unwrap_or(false)
    }

    fn read_all(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.files.lock().map_err(|_| Self::poisoned())?;
        files
            .get(path)
            .cloned()
            .ok_or_else(|| Error::NotFound(path.to_path_buf()))
    }

    fn write_all(&self, path: &Path, data: &[u8]) -> Result<()> {
        let mut files = self.files.lock().map_err(|_| Self::poisoned())?;
        files.insert(path.to_path_buf(), data.to_vec());
        Ok(())
    }

    fn remove(&self, path: &Path) -> Result<()> {
        let mut files = self.files.lock().map_err(|_| Self::poisoned())?;
        files.remove(path);
        Ok(())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut dirs = self.dirs.lock().map_err(|_| Self::poisoned())?;
        dirs.insert(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
