use tracing::{debug, info};

use crate::config::{PathTransform, ShardLocation};
use crate::constants::storage::PATH_SEPARATOR;
use crate::errors::StorageError;
use crate::storage::{ListMode, ObjectStore, StoragePath};

/// Discovers shard directories directly under a root prefix.
///
/// Only immediate child prefixes are inspected (one delimited listing call).
/// A child qualifies when it ends with the path separator and its key contains
/// the shard marker; each qualifying child is then passed through the mode's
/// path transform.
pub struct DirectoryResolver<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    marker: String,
    transform: PathTransform,
}

impl<'a, S: ObjectStore + ?Sized> DirectoryResolver<'a, S> {
    /// Resolver that keeps children containing `marker`, untransformed.
    pub fn new(store: &'a S, marker: impl Into<String>) -> Self {
        Self {
            store,
            marker: marker.into(),
            transform: PathTransform::identity(),
        }
    }

    /// Apply `transform` to every qualifying shard directory.
    pub fn with_transform(mut self, transform: PathTransform) -> Self {
        self.transform = transform;
        self
    }

    /// True if a listed child prefix names a shard directory.
    pub fn is_shard_prefix(&self, prefix: &str) -> bool {
        prefix.ends_with(PATH_SEPARATOR) && prefix.contains(self.marker.as_str())
    }

    /// List `root` and return the qualifying shard locations in listing order.
    ///
    /// `root` is treated as a directory even without a trailing separator.
    /// Listing failures propagate unchanged.
    pub fn resolve(&self, root: &StoragePath) -> Result<Vec<ShardLocation>, StorageError> {
        let root = root.as_dir();
        let listing = self.store.list(&root, ListMode::Delimited)?;
        let mut locations = Vec::new();
        for prefix in &listing.prefixes {
            if !self.is_shard_prefix(prefix) {
                debug!(root = %root, prefix = %prefix, "skipping non-shard prefix");
                continue;
            }
            let location = self.transform.apply(&root.with_key(prefix.as_str()));
            debug!(shard_dir = %location.shard_dir, "resolved shard directory");
            locations.push(location);
        }
        info!(
            root = %root,
            listed = listing.prefixes.len(),
            shards = locations.len(),
            "resolved shard directories"
        );
        Ok(locations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::modes::DEDUP_SUB_PATH;
    use crate::storage::MemoryStore;
    use crate::task::ShardDir;

    const MARKER: &str = "DCLM_sub_by_keywords";

    fn path(raw: &str) -> StoragePath {
        StoragePath::parse(raw).unwrap()
    }

    fn seeded_store() -> MemoryStore {
        MemoryStore::new()
            .with_object(&path("oss://b/origin/CC-01_DCLM_sub_by_keywords/f0.jsonl"), "x")
            .with_object(&path("oss://b/origin/CC-02_DCLM_sub_by_keywords/f0.jsonl"), "x")
            .with_object(&path("oss://b/origin/CC-03_other/f0.jsonl"), "x")
            .with_object(&path("oss://b/origin/DCLM_sub_by_keywords.txt"), "x")
    }

    #[test]
    fn keeps_only_marked_directories_in_listing_order() {
        let store = seeded_store();
        let resolver = DirectoryResolver::new(&store, MARKER);
        let shards: Vec<ShardDir> = resolver
            .resolve(&path("oss://b/origin/"))
            .unwrap()
            .into_iter()
            .map(|location| location.shard_dir)
            .collect();
        assert_eq!(
            shards,
            vec![
                ShardDir::Path("oss://b/origin/CC-01_DCLM_sub_by_keywords/".to_string()),
                ShardDir::Path("oss://b/origin/CC-02_DCLM_sub_by_keywords/".to_string()),
            ]
        );
    }

    #[test]
    fn root_without_trailing_separator_lists_its_children() {
        let store = seeded_store();
        let resolver = DirectoryResolver::new(&store, MARKER);
        let shards = resolver.resolve(&path("oss://b/origin")).unwrap();
        assert_eq!(shards.len(), 2);
    }

    #[test]
    fn marker_and_separator_are_both_required() {
        let store = MemoryStore::new();
        let resolver = DirectoryResolver::new(&store, MARKER);
        assert!(resolver.is_shard_prefix("origin/CC-01_DCLM_sub_by_keywords/"));
        assert!(!resolver.is_shard_prefix("origin/CC-01_DCLM_sub_by_keywords"));
        assert!(!resolver.is_shard_prefix("origin/CC-03_other/"));
    }

    #[test]
    fn transform_is_applied_to_each_shard() {
        let store = seeded_store();
        let resolver = DirectoryResolver::new(&store, MARKER).with_transform(
            PathTransform::identity()
                .with_sub_path(DEDUP_SUB_PATH)
                .with_list_wrap(true),
        );
        let shards = resolver.resolve(&path("oss://b/origin/")).unwrap();
        assert_eq!(
            shards[0].listing_path.key(),
            "origin/CC-01_DCLM_sub_by_keywords/processed_data/"
        );
        assert!(matches!(shards[0].shard_dir, ShardDir::Wrapped(ref paths) if paths.len() == 1));
    }

    #[test]
    fn empty_root_yields_no_shards() {
        let store = MemoryStore::new();
        let resolver = DirectoryResolver::new(&store, MARKER);
        assert!(resolver.resolve(&path("oss://b/origin/")).unwrap().is_empty());
    }
}
