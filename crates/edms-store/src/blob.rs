//! Content-addressed storage for file revision payloads.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use bytes::Bytes;

use crate::error::{StoreError, StoreResult};

/// Lower-case hex BLAKE3 digest of `data`, the key of every blob.
pub fn content_hash(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

/// Content-addressed blob store.
///
/// Blobs are immutable: the same bytes always land under the same key, so
/// writes are idempotent and concurrent reads are always safe.
pub trait BlobStore: Send + Sync {
    /// Store `data` and return its content hash.
    fn put(&self, data: Bytes) -> StoreResult<String>;

    /// Read a blob by content hash. `Ok(None)` if absent.
    fn get(&self, hash: &str) -> StoreResult<Option<Bytes>>;

    fn contains(&self, hash: &str) -> StoreResult<bool>;

    /// Store `data` only if it hashes to `expected`.
    fn put_verified(&self, expected: &str, data: Bytes) -> StoreResult<()> {
        let computed = content_hash(&data);
        if !computed.eq_ignore_ascii_case(expected) {
            return Err(StoreError::HashMismatch {
                expected: expected.to_string(),
                computed,
            });
        }
        self.put(data).map(|_| ())
    }
}

/// HashMap-backed blob store for tests and embedding.
#[derive(Default)]
pub struct InMemoryBlobStore {
    blobs: RwLock<HashMap<String, Bytes>>,
}

impl InMemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl BlobStore for InMemoryBlobStore {
    fn put(&self, data: Bytes) -> StoreResult<String> {
        let hash = content_hash(&data);
        let mut blobs = self.blobs.write().map_err(|_| StoreError::LockPoisoned)?;
        blobs.entry(hash.clone()).or_insert(data);
        Ok(hash)
    }

    fn get(&self, hash: &str) -> StoreResult<Option<Bytes>> {
        let blobs = self.blobs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(blobs.get(&hash.to_ascii_lowercase()).cloned())
    }

    fn contains(&self, hash: &str) -> StoreResult<bool> {
        let blobs = self.blobs.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(blobs.contains_key(&hash.to_ascii_lowercase()))
    }
}

impl std::fmt::Debug for InMemoryBlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryBlobStore")
            .field("blob_count", &self.len())
            .finish()
    }
}

/// Directory-backed blob store. Blobs live at `<root>/<hash[..2]>/<hash>`.
#[derive(Debug)]
pub struct FsBlobStore {
    root: PathBuf,
}

impl FsBlobStore {
    pub fn open(root: impl AsRef<Path>) -> StoreResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn path_for(&self, hash: &str) -> PathBuf {
        let hash = hash.to_ascii_lowercase();
        let prefix = hash.get(..2).unwrap_or("__").to_string();
        self.root.join(prefix).join(hash)
    }
}

impl BlobStore for FsBlobStore {
    fn put(&self, data: Bytes) -> StoreResult<String> {
        let hash = content_hash(&data);
        let path = self.path_for(&hash);
        if path.exists() {
            return Ok(hash);
        }
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        // Write-then-rename so readers never observe a partial blob.
        let staging = path.with_extension("tmp");
        fs::write(&staging, &data)?;
        fs::rename(&staging, &path)?;
        tracing::debug!(hash = %hash, size = data.len(), "blob written");
        Ok(hash)
    }

    fn get(&self, hash: &str) -> StoreResult<Option<Bytes>> {
        match fs::read(self.path_for(hash)) {
            Ok(data) => Ok(Some(Bytes::from(data))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, hash: &str) -> StoreResult<bool> {
        Ok(self.path_for(hash).is_file())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(store: &dyn BlobStore) {
        let data = Bytes::from_static(b"thermal model v1");
        let hash = store.put(data.clone()).unwrap();
        assert_eq!(hash, content_hash(b"thermal model v1"));
        assert_eq!(hash.len(), 64);
        assert!(store.contains(&hash).unwrap());
        assert_eq!(store.get(&hash).unwrap(), Some(data.clone()));
        assert_eq!(store.put(data).unwrap(), hash);
        assert_eq!(store.get(&content_hash(b"missing")).unwrap(), None);
    }

    #[test]
    fn in_memory_store() {
        let store = InMemoryBlobStore::new();
        exercise(&store);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn filesystem_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsBlobStore::open(dir.path()).unwrap();
        exercise(&store);
    }

    #[test]
    fn put_verified_rejects_wrong_hash() {
        let store = InMemoryBlobStore::new();
        let err = store
            .put_verified(&content_hash(b"a"), Bytes::from_static(b"b"))
            .unwrap_err();
        assert!(matches!(err, StoreError::HashMismatch { .. }));
        assert!(store.is_empty());
        store
            .put_verified(&content_hash(b"b").to_uppercase(), Bytes::from_static(b"b"))
            .unwrap();
        assert_eq!(store.len(), 1);
    }
}
