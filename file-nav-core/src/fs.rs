use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Minimal metadata for a single path.
#[derive(Clone, Debug)]
pub struct FsMetadata {
    /// Whether the path refers to a directory.
    pub is_dir: bool,
    /// File size in bytes (files only).
    pub size: Option<u64>,
    /// Last modified timestamp (when available).
    pub modified: Option<SystemTime>,
}

/// Directory entry returned by [`FileSystem::read_dir`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FsEntry {
    /// Base name (no parent path)
    pub name: String,
    /// Full path
    pub path: PathBuf,
    /// Whether this entry is a directory.
    pub is_dir: bool,
    /// File size in bytes (files only; `None` for directories or when unavailable).
    pub size: Option<u64>,
    /// Last modified timestamp (when available).
    pub modified: Option<SystemTime>,
}

/// Filesystem collaborator.
///
/// Only metadata is ever inspected; file contents are never read. The trait
/// is `Send + Sync` so enumeration can be moved onto a worker thread.
pub trait FileSystem: Send + Sync {
    /// List the immediate children of a directory (non-recursive).
    fn read_dir(&self, dir: &Path) -> std::io::Result<Vec<FsEntry>>;
    /// Fetch minimal metadata for a path.
    fn metadata(&self, path: &Path) -> std::io::Result<FsMetadata>;
    /// Whether the path still exists.
    fn exists(&self, path: &Path) -> bool {
        self.metadata(path).is_ok()
    }
    /// Whether the path exists and is a directory.
    fn is_dir(&self, path: &Path) -> bool {
        self.metadata(path).map(|m| m.is_dir).unwrap_or(false)
    }
}

/// Default filesystem implementation using `std::fs`.
#[derive(Clone, Copy, Debug, Default)]
pub struct StdFileSystem;

impl FileSystem for StdFileSystem {
    fn read_dir(&self, dir: &Path) -> std::io::Result<Vec<FsEntry>> {
        let mut out = Vec::new();
        for e in std::fs::read_dir(dir)? {
            let e = match e {
                Ok(v) => v,
                Err(_) => continue,
            };
            let name = e.file_name().to_string_lossy().to_string();
            let path = e.path();
            // Follow symlinks so a link to a directory lists as a directory.
            let meta = std::fs::metadata(&path).ok();
            let is_dir = meta.as_ref().map(|m| m.is_dir()).unwrap_or(false);
            let modified = meta.as_ref().and_then(|m| m.modified().ok());
            let size = if is_dir {
                None
            } else {
                meta.as_ref().filter(|m| m.is_file()).map(|m| m.len())
            };
            out.push(FsEntry {
                name,
                path,
                is_dir,
                size,
                modified,
            });
        }
        Ok(out)
    }

    fn metadata(&self, path: &Path) -> std::io::Result<FsMetadata> {
        let md = std::fs::metadata(path)?;
        Ok(FsMetadata {
            is_dir: md.is_dir(),
            size: md.is_file().then(|| md.len()),
            modified: md.modified().ok(),
        })
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }
}

/// In-memory filesystem double.
///
/// Paths are stored verbatim; parents are not created implicitly. Used by
/// unit tests and by hosts that want a dry-run navigator.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    nodes: parking_lot::RwLock<std::collections::BTreeMap<PathBuf, FsMetadata>>,
    failing: parking_lot::RwLock<std::collections::BTreeSet<PathBuf>>,
}

impl MemoryFileSystem {
    /// Creates an empty filesystem.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a directory node.
    pub fn add_dir(&self, path: impl Into<PathBuf>) {
        self.nodes.write().insert(
            path.into(),
            FsMetadata {
                is_dir: true,
                size: None,
                modified: None,
            },
        );
    }

    /// Adds a file node with a size.
    pub fn add_file(&self, path: impl Into<PathBuf>, size: u64) {
        self.nodes.write().insert(
            path.into(),
            FsMetadata {
                is_dir: false,
                size: Some(size),
                modified: None,
            },
        );
    }

    /// Removes a node and everything below it.
    pub fn remove(&self, path: &Path) {
        self.nodes.write().retain(|p, _| !p.starts_with(path));
    }

    /// Makes `read_dir` on `path` fail with `PermissionDenied`.
    pub fn fail_read_dir(&self, path: impl Into<PathBuf>) {
        self.failing.write().insert(path.into());
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_dir(&self, dir: &Path) -> std::io::Result<Vec<FsEntry>> {
        if self.failing.read().contains(dir) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read_dir denied",
            ));
        }
        let nodes = self.nodes.read();
        match nodes.get(dir) {
            Some(m) if m.is_dir => {}
            Some(_) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotADirectory,
                    "not a directory",
                ));
            }
            None => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "not found",
                ));
            }
        }
        Ok(nodes
            .iter()
            .filter(|(p, _)| p.parent() == Some(dir))
            .map(|(p, m)| FsEntry {
                name: p
                    .file_name()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default(),
                path: p.clone(),
                is_dir: m.is_dir,
                size: m.size,
                modified: m.modified,
            })
            .collect())
    }

    fn metadata(&self, path: &Path) -> std::io::Result<FsMetadata> {
        self.nodes
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| std::io::Error::new(std::io::ErrorKind::NotFound, "not found"))
    }
}
