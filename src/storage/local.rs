use std::fs;
use std::path::{Component, Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::constants::storage::{LOCAL_TEMP_SUFFIX, PATH_SEPARATOR};
use crate::errors::StorageError;
use crate::storage::{ListMode, Listing, ObjectStore, StoragePath};
use crate::types::ObjectKey;

/// Filesystem-backed object store.
///
/// `scheme://bucket/key` maps onto `<root>/<bucket>/<key>`. Buckets must exist
/// as directories; listing a missing bucket fails with `NotFound`, while
/// listing a missing prefix inside a bucket returns an empty listing.
/// Directories are never reported as objects, matching object stores that
/// only materialize prefixes through the keys beneath them. Regular files and
/// symlinks to files are objects; symlinked directories are not descended.
///
/// Writes are staged as hidden files directly under the root, outside every
/// bucket, and renamed into place. Buckets must share the root's filesystem.
pub struct LocalStore {
    root: PathBuf,
    staged: AtomicU64,
}

impl LocalStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            staged: AtomicU64::new(0),
        }
    }

    fn bucket_dir(&self, path: &StoragePath) -> PathBuf {
        self.root.join(path.bucket())
    }

    /// Resolve `path` to a filesystem location, rejecting keys that would
    /// escape the bucket directory.
    fn resolve(&self, path: &StoragePath) -> Result<PathBuf, StorageError> {
        let relative = Path::new(path.key());
        let escapes = relative
            .components()
            .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(StorageError::InvalidPath {
                path: path.to_string(),
                reason: "key must stay inside its bucket".to_string(),
            });
        }
        Ok(self.bucket_dir(path).join(relative))
    }

    fn staging_path(&self) -> PathBuf {
        let seq = self.staged.fetch_add(1, Ordering::Relaxed);
        self.root
            .join(format!(".put-{}-{seq}{LOCAL_TEMP_SUFFIX}", process::id()))
    }

    /// Bucket-relative key for `entry` when it is an object, `None` for
    /// directories and dangling links.
    fn object_key(
        prefix: &StoragePath,
        bucket_dir: &Path,
        entry: &DirEntry,
    ) -> Result<Option<ObjectKey>, StorageError> {
        let file_type = entry.file_type();
        let is_object = file_type.is_file() || (file_type.is_symlink() && entry.path().is_file());
        if !is_object {
            return Ok(None);
        }
        let relative = entry
            .path()
            .strip_prefix(bucket_dir)
            .map_err(|err| StorageError::Backend {
                path: prefix.to_string(),
                reason: err.to_string(),
            })?;
        let mut key = ObjectKey::new();
        for component in relative.components() {
            let Some(part) = component.as_os_str().to_str() else {
                return Err(StorageError::InvalidPath {
                    path: entry.path().to_string_lossy().into_owned(),
                    reason: "file name is not valid UTF-8".to_string(),
                });
            };
            if !key.is_empty() {
                key.push(PATH_SEPARATOR);
            }
            key.push_str(part);
        }
        Ok(Some(key))
    }

    /// First object found beneath `dir`, stopping the walk at the first hit.
    fn first_object(
        prefix: &StoragePath,
        bucket_dir: &Path,
        dir: &Path,
    ) -> Result<Option<ObjectKey>, StorageError> {
        for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
            let entry = entry.map_err(|err| walk_error(prefix, err))?;
            if let Some(key) = Self::object_key(prefix, bucket_dir, &entry)? {
                return Ok(Some(key));
            }
        }
        Ok(None)
    }
}

fn walk_error(prefix: &StoragePath, err: walkdir::Error) -> StorageError {
    StorageError::Backend {
        path: prefix.to_string(),
        reason: err.to_string(),
    }
}

impl ObjectStore for LocalStore {
    fn list(&self, prefix: &StoragePath, mode: ListMode) -> Result<Listing, StorageError> {
        let bucket_dir = self.bucket_dir(prefix);
        if !bucket_dir.is_dir() {
            return Err(StorageError::NotFound {
                path: prefix.to_string(),
            });
        }
        // Walk from the deepest directory the raw prefix fully names.
        let dir_key = match prefix.key().rfind(PATH_SEPARATOR) {
            Some(idx) => &prefix.key()[..idx],
            None => "",
        };
        let walk_root = self.resolve(&prefix.with_key(dir_key))?;
        if !walk_root.is_dir() {
            debug!(prefix = %prefix, "local prefix has no backing directory");
            return Ok(Listing::default());
        }
        let mut keys = Vec::new();
        match mode {
            ListMode::Recursive => {
                for entry in WalkDir::new(&walk_root) {
                    let entry = entry.map_err(|err| walk_error(prefix, err))?;
                    if let Some(key) = Self::object_key(prefix, &bucket_dir, &entry)? {
                        keys.push(key);
                    }
                }
            }
            // A child directory only needs one object to surface as a prefix.
            ListMode::Delimited => {
                for entry in WalkDir::new(&walk_root).min_depth(1).max_depth(1) {
                    let entry = entry.map_err(|err| walk_error(prefix, err))?;
                    if entry.file_type().is_dir() {
                        if let Some(key) = Self::first_object(prefix, &bucket_dir, entry.path())? {
                            keys.push(key);
                        }
                    } else if let Some(key) = Self::object_key(prefix, &bucket_dir, &entry)? {
                        keys.push(key);
                    }
                }
            }
        }
        Ok(Listing::from_keys(
            prefix.key(),
            keys.iter().map(String::as_str),
            mode,
        ))
    }

    fn put(&self, path: &StoragePath, body: &[u8]) -> Result<(), StorageError> {
        if path.is_dir() {
            return Err(StorageError::InvalidPath {
                path: path.to_string(),
                reason: "cannot write an object at a directory key".to_string(),
            });
        }
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let staging = self.staging_path();
        fs::write(&staging, body)?;
        if let Err(err) = fs::rename(&staging, &target) {
            let _ = fs::remove_file(&staging);
            return Err(err.into());
        }
        debug!(path = %path, bytes = body.len(), "wrote local object");
        Ok(())
    }

    fn exists(&self, path: &StoragePath) -> Result<bool, StorageError> {
        if path.is_dir() {
            return Ok(false);
        }
        Ok(self.resolve(path)?.is_file())
    }
}
