//! Filesystem collaborator.
//!
//! File-backed providers never touch the filesystem directly; they go
//! through the [`FileSystem`] trait so tests (and embedders with virtual
//! file trees) can substitute their own implementation.
//!
//! [`OsFileSystem`] is the production implementation over `tokio::fs`.
//! [`InMemoryFileSystem`] is a mutable in-process tree with explicit
//! timestamps and symlinks, suitable for exercising reload behavior
//! deterministically.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::error::ConfigError;
use crate::provider::BoxFuture;

/// Minimal async filesystem surface needed by the file-backed providers.
pub trait FileSystem: Send + Sync {
    /// Reads the full contents of a regular file.
    fn file_contents<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Vec<u8>, ConfigError>>;

    /// Returns the last-modification timestamp of a file.
    fn last_modified<'a>(&'a self, path: &'a Path)
    -> BoxFuture<'a, Result<SystemTime, ConfigError>>;

    /// Lists the names of regular files directly inside a directory.
    ///
    /// Hidden files (leading `.`) and non-regular entries are omitted.
    fn list_file_names<'a>(&'a self, path: &'a Path)
    -> BoxFuture<'a, Result<Vec<String>, ConfigError>>;

    /// Resolves symlinks; returns the path unchanged if it is not a symlink.
    fn resolve_symlinks<'a>(&'a self, path: &'a Path)
    -> BoxFuture<'a, Result<PathBuf, ConfigError>>;
}

// ============================================================================
// OS filesystem
// ============================================================================

/// Production [`FileSystem`] over `tokio::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct OsFileSystem;

impl OsFileSystem {
    /// Creates the OS filesystem.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

fn map_io(path: &Path, err: &std::io::Error) -> ConfigError {
    if err.kind() == std::io::ErrorKind::NotFound {
        ConfigError::FileNotFound {
            path: path.to_path_buf(),
        }
    } else {
        ConfigError::io(path, err)
    }
}

impl FileSystem for OsFileSystem {
    fn file_contents<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Vec<u8>, ConfigError>> {
        Box::pin(async move {
            tokio::fs::read(path).await.map_err(|e| map_io(path, &e))
        })
    }

    fn last_modified<'a>(
        &'a self,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<SystemTime, ConfigError>> {
        Box::pin(async move {
            let metadata = tokio::fs::metadata(path)
                .await
                .map_err(|e| map_io(path, &e))?;

            metadata
                .modified()
                .map_err(|_| ConfigError::MissingLastModifiedTimestamp {
                    path: path.to_path_buf(),
                })
        })
    }

    fn list_file_names<'a>(
        &'a self,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<Vec<String>, ConfigError>> {
        Box::pin(async move {
            let metadata = tokio::fs::metadata(path)
                .await
                .map_err(|e| map_io(path, &e))?;
            if !metadata.is_dir() {
                return Err(ConfigError::NotADirectory {
                    path: path.to_path_buf(),
                });
            }

            let mut names = Vec::new();
            let mut entries = tokio::fs::read_dir(path)
                .await
                .map_err(|e| map_io(path, &e))?;

            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| map_io(path, &e))?
            {
                let Ok(name) = entry.file_name().into_string() else {
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }

                let Ok(file_type) = entry.file_type().await else {
                    continue;
                };
                if file_type.is_file() {
                    names.push(name);
                }
            }

            names.sort();
            Ok(names)
        })
    }

    fn resolve_symlinks<'a>(
        &'a self,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<PathBuf, ConfigError>> {
        Box::pin(async move {
            tokio::fs::canonicalize(path)
                .await
                .map_err(|e| map_io(path, &e))
        })
    }
}

// ============================================================================
// In-memory filesystem
// ============================================================================

#[derive(Clone, Debug)]
enum Entry {
    File {
        contents: Vec<u8>,
        modified: SystemTime,
    },
    Symlink(PathBuf),
}

/// A mutable in-process file tree.
///
/// Timestamps are supplied by the caller, which makes change-detection
/// behavior (same mtime, swapped symlink target, racing reloads) fully
/// deterministic in tests.
#[derive(Default)]
pub struct InMemoryFileSystem {
    entries: Mutex<HashMap<PathBuf, Entry>>,
}

impl InMemoryFileSystem {
    /// Creates an empty tree.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates or replaces a regular file.
    pub fn write_file(
        &self,
        path: impl Into<PathBuf>,
        contents: impl Into<Vec<u8>>,
        modified: SystemTime,
    ) {
        self.entries.lock().insert(
            path.into(),
            Entry::File {
                contents: contents.into(),
                modified,
            },
        );
    }

    /// Creates or replaces a symlink.
    pub fn write_symlink(&self, path: impl Into<PathBuf>, target: impl Into<PathBuf>) {
        self.entries
            .lock()
            .insert(path.into(), Entry::Symlink(target.into()));
    }

    /// Removes a file or symlink.
    pub fn remove(&self, path: &Path) {
        self.entries.lock().remove(path);
    }

    fn resolve(&self, path: &Path) -> Result<PathBuf, ConfigError> {
        let entries = self.entries.lock();
        let mut current = path.to_path_buf();

        // Bounded chain walk; a deeper chain is a cycle.
        for _ in 0..32 {
            match entries.get(&current) {
                Some(Entry::Symlink(target)) => current = target.clone(),
                Some(Entry::File { .. }) => return Ok(current),
                None => {
                    return Err(ConfigError::FileNotFound {
                        path: path.to_path_buf(),
                    });
                }
            }
        }

        Err(ConfigError::io(
            path,
            &std::io::Error::other("symlink cycle"),
        ))
    }
}

impl FileSystem for InMemoryFileSystem {
    fn file_contents<'a>(&'a self, path: &'a Path) -> BoxFuture<'a, Result<Vec<u8>, ConfigError>> {
        Box::pin(async move {
            let resolved = self.resolve(path)?;
            let entries = self.entries.lock();
            match entries.get(&resolved) {
                Some(Entry::File { contents, .. }) => Ok(contents.clone()),
                _ => Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                }),
            }
        })
    }

    fn last_modified<'a>(
        &'a self,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<SystemTime, ConfigError>> {
        Box::pin(async move {
            let resolved = self.resolve(path)?;
            let entries = self.entries.lock();
            match entries.get(&resolved) {
                Some(Entry::File { modified, .. }) => Ok(*modified),
                _ => Err(ConfigError::FileNotFound {
                    path: path.to_path_buf(),
                }),
            }
        })
    }

    fn list_file_names<'a>(
        &'a self,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<Vec<String>, ConfigError>> {
        Box::pin(async move {
            let entries = self.entries.lock();
            let mut names: Vec<String> = entries
                .iter()
                .filter_map(|(entry_path, entry)| {
                    if !matches!(entry, Entry::File { .. }) {
                        return None;
                    }
                    if entry_path.parent() != Some(path) {
                        return None;
                    }
                    let name = entry_path.file_name()?.to_str()?;
                    if name.starts_with('.') {
                        return None;
                    }
                    Some(name.to_string())
                })
                .collect();

            names.sort();
            Ok(names)
        })
    }

    fn resolve_symlinks<'a>(
        &'a self,
        path: &'a Path,
    ) -> BoxFuture<'a, Result<PathBuf, ConfigError>> {
        Box::pin(async move { self.resolve(path) })
    }
}
