//! Object-store capability used by task assignment.
//!
//! Ownership model:
//! - `ObjectStore` is the only seam between assignment and a storage backend.
//!   It exposes exactly three operations: prefix listing, object write, and
//!   existence check.
//! - `StoragePath` is a parsed `scheme://bucket/key` location. Backends receive
//!   it whole and decide how scheme and bucket map onto their namespace.
//! - `MemoryStore` and `LocalStore` are the built-in backends; vendor clients
//!   live outside this crate and implement the same trait.

use std::fmt;
use std::str::FromStr;

use crate::constants::storage::{PATH_SEPARATOR, SCHEME_SEPARATOR};
use crate::errors::StorageError;
use crate::types::ObjectKey;

/// Local-filesystem backend.
pub mod local;
/// In-memory backend.
pub mod memory;

pub use local::LocalStore;
pub use memory::MemoryStore;

/// Parsed object-store location of the form `scheme://bucket/key`.
///
/// The key is bucket-relative and may be empty (bucket root). Keys that end
/// with `/` name directory prefixes rather than objects.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StoragePath {
    scheme: String,
    bucket: String,
    key: ObjectKey,
}

impl StoragePath {
    /// Build a path from its parts.
    pub fn new(
        scheme: impl Into<String>,
        bucket: impl Into<String>,
        key: impl Into<ObjectKey>,
    ) -> Result<Self, StorageError> {
        let path = Self {
            scheme: scheme.into(),
            bucket: bucket.into(),
            key: key.into(),
        };
        if path.scheme.is_empty() {
            return Err(path.invalid("missing scheme"));
        }
        if path.bucket.is_empty() || path.bucket.contains(PATH_SEPARATOR) {
            return Err(path.invalid("bucket name must be non-empty and contain no separator"));
        }
        Ok(path)
    }

    /// Parse `scheme://bucket/key`.
    pub fn parse(raw: &str) -> Result<Self, StorageError> {
        let Some((scheme, rest)) = raw.split_once(SCHEME_SEPARATOR) else {
            return Err(StorageError::InvalidPath {
                path: raw.to_string(),
                reason: format!("expected 'scheme{SCHEME_SEPARATOR}bucket/key'"),
            });
        };
        let (bucket, key) = rest.split_once(PATH_SEPARATOR).unwrap_or((rest, ""));
        Self::new(scheme, bucket, key)
    }

    /// URI scheme, e.g. `oss`.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Bucket name.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Bucket-relative key.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Same scheme and bucket, different key.
    pub fn with_key(&self, key: impl Into<ObjectKey>) -> Self {
        Self {
            scheme: self.scheme.clone(),
            bucket: self.bucket.clone(),
            key: key.into(),
        }
    }

    /// True when the key names a directory prefix (empty or separator-terminated).
    pub fn is_dir(&self) -> bool {
        self.key.is_empty() || self.key.ends_with(PATH_SEPARATOR)
    }

    /// Directory form of this path, adding a trailing separator when missing.
    pub fn as_dir(&self) -> Self {
        if self.is_dir() {
            return self.clone();
        }
        self.with_key(format!("{}{}", self.key, PATH_SEPARATOR))
    }

    /// Append `segment` to the key, inserting a separator when needed.
    pub fn join(&self, segment: &str) -> Self {
        let segment = segment.trim_start_matches(PATH_SEPARATOR);
        if self.is_dir() {
            self.with_key(format!("{}{}", self.key, segment))
        } else {
            self.with_key(format!("{}{}{}", self.key, PATH_SEPARATOR, segment))
        }
    }

    fn invalid(&self, reason: &str) -> StorageError {
        StorageError::InvalidPath {
            path: self.to_string(),
            reason: reason.to_string(),
        }
    }
}

impl fmt::Display for StoragePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}{}{}",
            self.scheme, SCHEME_SEPARATOR, self.bucket, PATH_SEPARATOR, self.key
        )
    }
}

impl FromStr for StoragePath {
    type Err = StorageError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Self::parse(raw)
    }
}

/// How far a listing descends below the requested prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ListMode {
    /// Immediate children only: direct objects plus child prefixes.
    Delimited,
    /// Every object under the prefix, at any depth.
    Recursive,
}

/// Result of a prefix listing. Keys are bucket-relative and lexically ordered.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Listing {
    /// Object keys found under the prefix.
    pub objects: Vec<ObjectKey>,
    /// Child prefixes (always separator-terminated). Empty for recursive listings.
    pub prefixes: Vec<ObjectKey>,
}

impl Listing {
    /// Group raw object keys under `prefix` the way a delimiter-aware object
    /// store does. Keys that do not start with `prefix` are ignored.
    pub fn from_keys<'a, I>(prefix: &str, keys: I, mode: ListMode) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut objects = Vec::new();
        let mut prefixes = Vec::new();
        for key in keys {
            let Some(rest) = key.strip_prefix(prefix) else {
                continue;
            };
            match (mode, rest.find(PATH_SEPARATOR)) {
                (ListMode::Delimited, Some(idx)) => {
                    prefixes.push(format!("{}{}", prefix, &rest[..=idx]));
                }
                _ => objects.push(key.to_string()),
            }
        }
        objects.sort();
        prefixes.sort();
        prefixes.dedup();
        Self { objects, prefixes }
    }

    /// Object keys that name files, skipping separator-terminated directory markers.
    pub fn file_keys(&self) -> impl Iterator<Item = &ObjectKey> {
        self.objects
            .iter()
            .filter(|key| !key.ends_with(PATH_SEPARATOR))
    }
}

/// Narrow storage capability required by task assignment.
///
/// Implementations perform no retries on behalf of callers; any error is
/// surfaced as-is.
pub trait ObjectStore: Send + Sync {
    /// List keys under `prefix` (a raw key prefix, not necessarily a directory).
    fn list(&self, prefix: &StoragePath, mode: ListMode) -> Result<Listing, StorageError>;
    /// Create or replace the object at `path`.
    fn put(&self, path: &StoragePath, body: &[u8]) -> Result<(), StorageError>;
    /// Report whether an object exists at `path`.
    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError>;
}

impl<S: ObjectStore + ?Sized> ObjectStore for &S {
    fn list(&self, prefix: &StoragePath, mode: ListMode) -> Result<Listing, StorageError> {
        (**self).list(prefix, mode)
    }

    fn put(&self, path: &StoragePath, body: &[u8]) -> Result<(), StorageError> {
        (**self).put(path, body)
    }

    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError> {
        (**self).exists(path)
    }
}

impl<S: ObjectStore + ?Sized> ObjectStore for Box<S> {
    fn list(&self, prefix: &StoragePath, mode: ListMode) -> Result<Listing, StorageError> {
        (**self).list(prefix, mode)
    }

    fn put(&self, path: &StoragePath, body: &[u8]) -> Result<(), StorageError> {
        (**self).put(path, body)
    }

    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError> {
        (**self).exists(path)
    }
}
