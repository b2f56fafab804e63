//! Manifest construction, validation, and persistence.
//!
//! A manifest is rebuilt from scratch on every run. Writing one over an
//! existing manifest discards whatever claim state workers recorded in it;
//! the writer logs a warning when that happens but does not merge.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use tracing::{info, warn};

use crate::constants::manifest::MANIFEST_INDENT;
use crate::errors::AssignError;
use crate::storage::{ObjectStore, StoragePath};
use crate::task::{FileRange, ShardDir, Task, TaskKey};
use crate::types::PathString;

/// Ordered task list; serialized as `{ "tasks": [...] }`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Tasks in build order (shard order, then ascending range).
    pub tasks: Vec<Task>,
}

impl Manifest {
    /// Number of tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when the manifest has no tasks.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Task with the given natural key.
    pub fn find(&self, key: &TaskKey) -> Option<&Task> {
        self.tasks
            .iter()
            .find(|task| task.shard_dir == key.0 && task.file_range == key.1)
    }

    /// Distinct shard directories in first-seen order.
    pub fn shard_dirs(&self) -> Vec<&ShardDir> {
        let mut seen = HashSet::new();
        self.tasks
            .iter()
            .map(|task| &task.shard_dir)
            .filter(|dir| seen.insert(*dir))
            .collect()
    }

    /// Pretty-printed JSON document with four-space indentation.
    pub fn to_json_pretty(&self) -> Result<Vec<u8>, AssignError> {
        let mut body = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(MANIFEST_INDENT);
        let mut serializer = serde_json::Serializer::with_formatter(&mut body, formatter);
        self.serialize(&mut serializer)?;
        Ok(body)
    }

    /// Parse a manifest document.
    pub fn from_json(body: &[u8]) -> Result<Self, AssignError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Check the structural invariants every freshly built manifest satisfies:
    /// unique `(shard_dir, file_range)` keys, a whole-shard range only as the
    /// sole task of its shard, and bounded ranges per shard that tile
    /// `[0, n)` without gaps or overlaps.
    pub fn validate(&self) -> Result<(), AssignError> {
        let mut keys = HashSet::with_capacity(self.tasks.len());
        let mut per_shard: HashMap<&ShardDir, Vec<FileRange>> = HashMap::new();
        for task in &self.tasks {
            if !keys.insert((&task.shard_dir, task.file_range)) {
                return Err(AssignError::InvalidManifest(format!(
                    "duplicate task {} {}",
                    task.shard_dir, task.file_range
                )));
            }
            per_shard
                .entry(&task.shard_dir)
                .or_default()
                .push(task.file_range);
        }
        for (shard_dir, mut ranges) in per_shard {
            if ranges.iter().any(FileRange::is_whole) {
                if ranges.len() != 1 {
                    return Err(AssignError::InvalidManifest(format!(
                        "shard {shard_dir} mixes a whole-shard range with other ranges"
                    )));
                }
                continue;
            }
            ranges.sort_unstable();
            let mut next = 0;
            for range in ranges {
                let FileRange::Bounded { start, end } = range else {
                    continue;
                };
                if start >= end {
                    return Err(AssignError::InvalidManifest(format!(
                        "shard {shard_dir} has an empty range {range}"
                    )));
                }
                if start != next {
                    return Err(AssignError::InvalidManifest(format!(
                        "shard {shard_dir} has a gap or overlap at index {next} (next range starts at {start})"
                    )));
                }
                next = end;
            }
        }
        Ok(())
    }
}

/// Accumulates tasks shard by shard, preserving insertion order.
#[derive(Debug, Default)]
pub struct ManifestBuilder {
    tasks: Vec<Task>,
}

impl ManifestBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one unclaimed task per range for `shard_dir`. Returns the number
    /// of tasks added.
    pub fn push_shard(&mut self, shard_dir: &ShardDir, ranges: &[FileRange]) -> usize {
        self.tasks.extend(
            ranges
                .iter()
                .map(|range| Task::unclaimed(shard_dir.clone(), *range)),
        );
        ranges.len()
    }

    /// Builder-style [`ManifestBuilder::push_shard`].
    pub fn with_shard(mut self, shard_dir: &ShardDir, ranges: &[FileRange]) -> Self {
        self.push_shard(shard_dir, ranges);
        self
    }

    /// Tasks added so far.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// True when no tasks have been added.
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Finish and return the manifest.
    pub fn build(self) -> Manifest {
        Manifest { tasks: self.tasks }
    }
}

/// Result of persisting a manifest.
///
/// A failed write or a failed post-write existence check is a `Failed`
/// outcome rather than an error, so callers can tell it apart from discovery
/// failures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The manifest was written and found at its target path.
    Written {
        /// Target path.
        path: PathString,
        /// Number of tasks written.
        task_count: usize,
    },
    /// The write call failed or the object was absent afterwards.
    Failed {
        /// Target path.
        path: PathString,
        /// Human-readable cause.
        reason: String,
    },
}

impl WriteOutcome {
    /// True for `Written`.
    pub fn is_success(&self) -> bool {
        matches!(self, WriteOutcome::Written { .. })
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOutcome::Written { task_count, .. } => {
                write!(f, "Success: {task_count} tasks generated")
            }
            WriteOutcome::Failed { path, reason } => write!(f, "Failed: {path}: {reason}"),
        }
    }
}

/// Writes manifests and verifies them by existence check.
pub struct ManifestWriter<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: ObjectStore + ?Sized> ManifestWriter<'a, S> {
    /// Writer over `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Serialize `manifest`, write it to `target`, then confirm it exists.
    ///
    /// Only serialization failures are returned as errors.
    pub fn write(
        &self,
        manifest: &Manifest,
        target: &StoragePath,
    ) -> Result<WriteOutcome, AssignError> {
        let body = manifest.to_json_pretty()?;
        match self.store.exists(target) {
            Ok(true) => warn!(
                path = %target,
                "overwriting existing manifest; claim state recorded in it is discarded"
            ),
            Ok(false) => {}
            Err(err) => warn!(path = %target, error = %err, "could not check for an existing manifest"),
        }

        let path = target.to_string();
        if let Err(err) = self.store.put(target, &body) {
            warn!(path = %target, error = %err, "manifest write failed");
            return Ok(WriteOutcome::Failed {
                path,
                reason: format!("write failed: {err}"),
            });
        }
        let outcome = match self.store.exists(target) {
            Ok(true) => WriteOutcome::Written {
                path,
                task_count: manifest.len(),
            },
            Ok(false) => WriteOutcome::Failed {
                path,
                reason: "manifest not found after write".to_string(),
            },
            Err(err) => WriteOutcome::Failed {
                path,
                reason: format!("existence check failed: {err}"),
            },
        };
        match &outcome {
            WriteOutcome::Written { task_count, .. } => {
                info!(path = %target, tasks = task_count, bytes = body.len(), "manifest written")
            }
            WriteOutcome::Failed { reason, .. } => {
                warn!(path = %target, reason = %reason, "manifest verification failed")
            }
        }
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::StorageError;
    use crate::storage::{ListMode, Listing, MemoryStore};
    use crate::task::{Claim, Lease, LeaseStatus};

    fn shard(name: &str) -> ShardDir {
        ShardDir::Path(format!("oss://b/root/{name}/"))
    }

    fn range(start: usize, end: usize) -> FileRange {
        FileRange::Bounded { start, end }
    }

    fn target() -> StoragePath {
        StoragePath::parse("oss://b/tasks.json").unwrap()
    }

    /// Accepts writes but never reports the object as present.
    struct VanishingStore;

    impl ObjectStore for VanishingStore {
        fn list(&self, _prefix: &StoragePath, _mode: ListMode) -> Result<Listing, StorageError> {
            Ok(Listing::default())
        }

        fn put(&self, _path: &StoragePath, _body: &[u8]) -> Result<(), StorageError> {
            Ok(())
        }

        fn exists(&self, _path: &StoragePath) -> Result<bool, StorageError> {
            Ok(false)
        }
    }

    /// Rejects every write.
    struct ReadOnlyStore;

    impl ObjectStore for ReadOnlyStore {
        fn list(&self, _prefix: &StoragePath, _mode: ListMode) -> Result<Listing, StorageError> {
            Ok(Listing::default())
        }

        fn put(&self, path: &StoragePath, _body: &[u8]) -> Result<(), StorageError> {
            Err(StorageError::Backend {
                path: path.to_string(),
                reason: "read-only".to_string(),
            })
        }

        fn exists(&self, _path: &StoragePath) -> Result<bool, StorageError> {
            Ok(false)
        }
    }

    #[test]
    fn builder_preserves_shard_then_range_order() {
        let manifest = ManifestBuilder::new()
            .with_shard(&shard("a"), &[range(0, 2), range(2, 3)])
            .with_shard(&shard("b"), &[])
            .with_shard(&shard("c"), &[FileRange::Whole])
            .build();
        let keys: Vec<TaskKey> = manifest.tasks.iter().map(Task::key).collect();
        assert_eq!(
            keys,
            vec![
                (shard("a"), range(0, 2)),
                (shard("a"), range(2, 3)),
                (shard("c"), FileRange::Whole),
            ]
        );
        assert!(manifest.tasks.iter().all(|task| task.worker == Claim::Unclaimed));
        assert_eq!(manifest.shard_dirs(), vec![&shard("a"), &shard("c")]);
        manifest.validate().unwrap();
    }

    #[test]
    fn pretty_json_wraps_tasks_field_with_four_space_indent() {
        let manifest = ManifestBuilder::new()
            .with_shard(&shard("a"), &[range(0, 1)])
            .build();
        let body = String::from_utf8(manifest.to_json_pretty().unwrap()).unwrap();
        assert!(body.starts_with("{\n    \"tasks\": [\n        {\n"));
        assert!(body.contains("\"worker\": null"));
    }

    #[test]
    fn json_round_trip_preserves_tasks_and_leases() {
        let mut manifest = ManifestBuilder::new()
            .with_shard(&shard("a"), &[range(0, 100), range(100, 150)])
            .with_shard(
                &ShardDir::Wrapped(vec!["oss://b/root/d/processed_data/".to_string()]),
                &[FileRange::Whole],
            )
            .build();
        manifest.tasks[1].worker = Claim::Leased(Lease {
            key: "10.0.0.7_4242".to_string(),
            status: LeaseStatus::Fail,
        });
        let parsed = Manifest::from_json(&manifest.to_json_pretty().unwrap()).unwrap();
        assert_eq!(parsed, manifest);
    }

    #[test]
    fn validate_rejects_duplicates_gaps_and_mixed_sentinels() {
        let duplicate = ManifestBuilder::new()
            .with_shard(&shard("a"), &[range(0, 5), range(0, 5)])
            .build();
        assert!(matches!(duplicate.validate(), Err(AssignError::InvalidManifest(_))));

        let gap = ManifestBuilder::new()
            .with_shard(&shard("a"), &[range(0, 5), range(6, 9)])
            .build();
        assert!(gap.validate().is_err());

        let late_start = ManifestBuilder::new()
            .with_shard(&shard("a"), &[range(1, 5)])
            .build();
        assert!(late_start.validate().is_err());

        let mixed = ManifestBuilder::new()
            .with_shard(&shard("a"), &[FileRange::Whole, range(0, 5)])
            .build();
        assert!(mixed.validate().is_err());
    }

    #[test]
    fn find_looks_up_by_natural_key() {
        let manifest = ManifestBuilder::new()
            .with_shard(&shard("a"), &[range(0, 5), range(5, 7)])
            .build();
        assert!(manifest.find(&(shard("a"), range(5, 7))).is_some());
        assert!(manifest.find(&(shard("b"), range(5, 7))).is_none());
    }

    #[test]
    fn writer_reports_success_after_existence_check() {
        let store = MemoryStore::new();
        let manifest = ManifestBuilder::new()
            .with_shard(&shard("a"), &[range(0, 3)])
            .build();
        let outcome = ManifestWriter::new(&store).write(&manifest, &target()).unwrap();
        assert!(outcome.is_success());
        assert_eq!(outcome.to_string(), "Success: 1 tasks generated");
        let stored = store.object(&target()).unwrap();
        assert_eq!(Manifest::from_json(&stored).unwrap(), manifest);
    }

    #[test]
    fn writer_overwrites_previous_manifest_without_merging() {
        let mut claimed = ManifestBuilder::new()
            .with_shard(&shard("a"), &[range(0, 3)])
            .build();
        claimed.tasks[0].worker = Claim::Leased(Lease {
            key: "w1".to_string(),
            status: LeaseStatus::Processing,
        });
        let store = MemoryStore::new().with_object(&target(), claimed.to_json_pretty().unwrap());

        let fresh = ManifestBuilder::new()
            .with_shard(&shard("a"), &[range(0, 3)])
            .build();
        let outcome = ManifestWriter::new(&store).write(&fresh, &target()).unwrap();
        assert!(outcome.is_success());
        let stored = Manifest::from_json(&store.object(&target()).unwrap()).unwrap();
        assert_eq!(stored.tasks[0].worker, Claim::Unclaimed);
    }

    #[test]
    fn missing_object_after_write_is_a_failed_outcome() {
        let manifest = ManifestBuilder::new()
            .with_shard(&shard("a"), &[range(0, 3)])
            .build();
        let outcome = ManifestWriter::new(&VanishingStore)
            .write(&manifest, &target())
            .unwrap();
        assert_eq!(
            outcome,
            WriteOutcome::Failed {
                path: "oss://b/tasks.json".to_string(),
                reason: "manifest not found after write".to_string(),
            }
        );
        assert!(outcome.to_string().starts_with("Failed"));
    }

    #[test]
    fn rejected_write_is_a_failed_outcome() {
        let manifest = Manifest::default();
        let outcome = ManifestWriter::new(&ReadOnlyStore)
            .write(&manifest, &target())
            .unwrap();
        assert!(!outcome.is_success());
        assert!(outcome.to_string().contains("read-only"));
    }
}
