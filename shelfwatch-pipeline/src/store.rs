//! Object-store abstraction with filesystem and in-memory implementations.
//!
//! Projections are opaque blobs under flat slash-separated keys, written
//! with a content type and a cache directive. The filesystem store backs
//! local runs (atomic tmp-then-rename writes); the in-memory store backs
//! tests, which can inspect what was written and with which headers.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

/// Write metadata attached to every object.
#[derive(Debug, Clone, Copy)]
pub struct PutOptions<'a> {
    pub content_type: &'a str,
    pub cache_control: &'a str,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid object key '{0}'")]
    InvalidKey(String),

    #[error("write '{key}': {reason}")]
    Write { key: String, reason: String },
}

/// A key/value blob store. Each `put` fully replaces any prior content at
/// the key.
pub trait ObjectStore: Send + Sync {
    /// Human-readable name of this store.
    fn name(&self) -> &str;

    fn put(&self, key: &str, body: &[u8], opts: &PutOptions<'_>) -> Result<(), StoreError>;
}

/// Filesystem-backed store: keys map to paths under a root directory.
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let relative = Path::new(key);
        let plain = !key.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(relative))
    }
}

impl ObjectStore for FsStore {
    fn name(&self) -> &str {
        "filesystem"
    }

    fn put(&self, key: &str, body: &[u8], _opts: &PutOptions<'_>) -> Result<(), StoreError> {
        let path = self.object_path(key)?;
        let write_err = |reason: String| StoreError::Write {
            key: key.to_string(),
            reason,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_err(e.to_string()))?;
        }

        // Atomic replace: readers never observe a half-written object.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, body).map_err(|e| write_err(e.to_string()))?;
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            write_err(e.to_string())
        })
    }
}

/// What an in-memory store holds per key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub body: Vec<u8>,
    pub content_type: String,
    pub cache_control: String,
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryStore {
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.objects.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn put(&self, key: &str, body: &[u8], opts: &PutOptions<'_>) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject {
                body: body.to_vec(),
                content_type: opts.content_type.to_string(),
                cache_control: opts.cache_control.to_string(),
            },
        );
        Ok(())
    }
}
