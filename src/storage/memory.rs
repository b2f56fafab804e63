use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::errors::StorageError;
use crate::storage::{ListMode, Listing, ObjectStore, StoragePath};
use crate::types::ObjectKey;

type BucketName = String;

/// In-memory object store with lexically ordered listings.
///
/// Objects are keyed by `(bucket, key)`; the scheme is not part of the
/// namespace, so `oss://b/k` and `s3://b/k` address the same object.
#[derive(Default)]
pub struct MemoryStore {
    objects: RwLock<BTreeMap<(BucketName, ObjectKey), Vec<u8>>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mainly for seeding fixtures.
    pub fn with_object(self, path: &StoragePath, body: impl Into<Vec<u8>>) -> Self {
        if let Ok(mut guard) = self.objects.write() {
            guard.insert(Self::slot(path), body.into());
        }
        self
    }

    /// Return a copy of the object body at `path`, if present.
    pub fn object(&self, path: &StoragePath) -> Option<Vec<u8>> {
        self.objects.read().ok()?.get(&Self::slot(path)).cloned()
    }

    /// Number of stored objects across all buckets.
    pub fn len(&self) -> usize {
        self.objects.read().map(|guard| guard.len()).unwrap_or(0)
    }

    /// True when no objects are stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(path: &StoragePath) -> (BucketName, ObjectKey) {
        (path.bucket().to_string(), path.key().to_string())
    }

    fn poisoned(path: &StoragePath) -> StorageError {
        StorageError::Backend {
            path: path.to_string(),
            reason: "memory store lock poisoned".to_string(),
        }
    }
}

impl ObjectStore for MemoryStore {
    fn list(&self, prefix: &StoragePath, mode: ListMode) -> Result<Listing, StorageError> {
        let guard = self.objects.read().map_err(|_| Self::poisoned(prefix))?;
        let keys = guard
            .keys()
            .filter(|(bucket, _)| bucket == prefix.bucket())
            .map(|(_, key)| key.as_str());
        Ok(Listing::from_keys(prefix.key(), keys, mode))
    }

    fn put(&self, path: &StoragePath, body: &[u8]) -> Result<(), StorageError> {
        let mut guard = self.objects.write().map_err(|_| Self::poisoned(path))?;
        guard.insert(Self::slot(path), body.to_vec());
        Ok(())
    }

    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError> {
        let guard = self.objects.read().map_err(|_| Self::poisoned(path))?;
        Ok(guard.contains_key(&Self::slot(path)))
    }
}
