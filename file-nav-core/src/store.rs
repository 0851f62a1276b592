//! Durable persistence collaborators.
//!
//! Two shapes are needed: a key-value store for access grants (one entry per
//! root) and a single document for the group collection. [`DataDir`] backs
//! both with files under an application-private directory; [`MemoryStore`]
//! keeps everything in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::core::StoreError;

#[cfg(feature = "tracing")]
use tracing::debug;

/// Durable key-value store.
pub trait KeyValueStore: Send + Sync {
    /// Read a value.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Insert or replace a value.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;
    /// Remove a value. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
    /// All keys, in ascending order.
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Durable single-document store.
pub trait DocumentStore: Send + Sync {
    /// Load the document, `None` when it was never written.
    fn load(&self) -> Result<Option<String>, StoreError>;
    /// Replace the whole document.
    fn save(&self, document: &str) -> Result<(), StoreError>;
}

/// Application-private data directory.
#[derive(Clone, Debug)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    /// File holding the access grant key-value map.
    pub const GRANTS_FILE: &'static str = "grants.json";
    /// File holding the group collection document.
    pub const GROUPS_FILE: &'static str = "groups.json";

    /// Opens (and creates if needed) the data directory.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// Root directory path.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Key-value store backed by [`Self::GRANTS_FILE`].
    pub fn key_values(&self) -> KeyValueFile {
        KeyValueFile::new(self.root.join(Self::GRANTS_FILE))
    }

    /// Document store backed by [`Self::GROUPS_FILE`].
    pub fn groups_document(&self) -> DocumentFile {
        DocumentFile::new(self.root.join(Self::GROUPS_FILE))
    }
}

/// Key-value map persisted as one JSON object, rewritten on every change.
#[derive(Debug)]
pub struct KeyValueFile {
    path: PathBuf,
    cache: Mutex<Option<BTreeMap<String, Vec<u8>>>>,
}

impl KeyValueFile {
    /// Creates a store for the given file. The file is read lazily.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(None),
        }
    }

    fn with_map<R>(
        &self,
        f: impl FnOnce(&mut BTreeMap<String, Vec<u8>>) -> R,
    ) -> Result<R, StoreError> {
        let mut guard = self.cache.lock();
        if guard.is_none() {
            *guard = Some(self.read_map()?);
        }
        let map = guard.get_or_insert_with(BTreeMap::new);
        Ok(f(map))
    }

    fn read_map(&self) -> Result<BTreeMap<String, Vec<u8>>, StoreError> {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(t) => t,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&text).map_err(|e| StoreError::Corrupt {
            name: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn flush(&self, map: &BTreeMap<String, Vec<u8>>) -> Result<(), StoreError> {
        let text = serde_json::to_string_pretty(map).map_err(|e| StoreError::Corrupt {
            name: self.path.display().to_string(),
            message: e.to_string(),
        })?;
        write_atomic(&self.path, text.as_bytes())
    }
}

impl KeyValueStore for KeyValueFile {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        self.with_map(|m| m.get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        let snapshot = self.with_map(|m| {
            m.insert(key.to_string(), value.to_vec());
            m.clone()
        })?;
        self.flush(&snapshot)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let snapshot = self.with_map(|m| m.remove(key).map(|_| m.clone()))?;
        match snapshot {
            Some(map) => self.flush(&map),
            None => Ok(()),
        }
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        self.with_map(|m| m.keys().cloned().collect())
    }
}

/// A single document file.
#[derive(Clone, Debug)]
pub struct DocumentFile {
    path: PathBuf,
}

impl DocumentFile {
    /// Creates a store for the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DocumentStore for DocumentFile {
    fn load(&self) -> Result<Option<String>, StoreError> {
        match std::fs::read_to_string(&self.path) {
            Ok(t) => Ok(Some(t)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, document: &str) -> Result<(), StoreError> {
        write_atomic(&self.path, document.as_bytes())
    }
}

/// Writes to a sibling temp file and renames it over the target, so readers
/// never observe a half-written document.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    #[cfg(feature = "tracing")]
    debug!(
        event = "store.write",
        path = %path.display(),
        bytes = bytes.len(),
        "store written"
    );
    Ok(())
}

/// In-memory store implementing both persistence shapes.
///
/// Clones share state, so a test can keep one handle and inspect what a
/// service persisted through another.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Debug, Default)]
struct MemoryStoreInner {
    values: Mutex<BTreeMap<String, Vec<u8>>>,
    document: Mutex<Option<String>>,
    saves: Mutex<usize>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of document saves performed so far.
    pub fn save_count(&self) -> usize {
        *self.inner.saves.lock()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner.values.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.inner
            .values
            .lock()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        self.inner.values.lock().remove(key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.inner.values.lock().keys().cloned().collect())
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self) -> Result<Option<String>, StoreError> {
        Ok(self.inner.document.lock().clone())
    }

    fn save(&self, document: &str) -> Result<(), StoreError> {
        *self.inner.document.lock() = Some(document.to_string());
        *self.inner.saves.lock() += 1;
        Ok(())
    }
}
