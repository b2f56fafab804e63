use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::manifest::WHOLE_SHARD_END;
use crate::types::{PathString, WorkerKey};

/// Directory a task covers, as recorded in the manifest.
///
/// Most modes record a plain path string. Modes that target a nested data
/// directory record it wrapped in a one-element list, which is how downstream
/// consumers tell the two layouts apart.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ShardDir {
    /// Plain shard directory path.
    Path(PathString),
    /// Shard directory path wrapped in a list.
    Wrapped(Vec<PathString>),
}

impl fmt::Display for ShardDir {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShardDir::Path(path) => f.write_str(path),
            ShardDir::Wrapped(paths) => write!(f, "[{}]", paths.join(", ")),
        }
    }
}

/// Index interval into a shard's file listing.
///
/// Serialized as a two-element array: `[start, end]` for a half-open bounded
/// range, or `[0, -1]` for the whole shard.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "[i64; 2]", into = "[i64; 2]")]
pub enum FileRange {
    /// Files `start..end` of the shard listing; `start < end`.
    Bounded {
        /// First file index (inclusive).
        start: usize,
        /// One past the last file index.
        end: usize,
    },
    /// Every file in the shard, however many there are.
    Whole,
}

impl FileRange {
    /// Bounded range, or `None` when `start >= end`.
    pub fn bounded(start: usize, end: usize) -> Option<Self> {
        (start < end).then_some(FileRange::Bounded { start, end })
    }

    /// True for the whole-shard sentinel.
    pub fn is_whole(&self) -> bool {
        matches!(self, FileRange::Whole)
    }

    /// Number of files covered, or `None` for the whole-shard sentinel.
    pub fn file_count(&self) -> Option<usize> {
        match self {
            FileRange::Bounded { start, end } => Some(end - start),
            FileRange::Whole => None,
        }
    }
}

impl TryFrom<[i64; 2]> for FileRange {
    type Error = String;

    fn try_from([start, end]: [i64; 2]) -> Result<Self, Self::Error> {
        if start == 0 && end == WHOLE_SHARD_END {
            return Ok(FileRange::Whole);
        }
        let (Ok(start_idx), Ok(end_idx)) = (usize::try_from(start), usize::try_from(end)) else {
            return Err(format!(
                "file range [{start}, {end}] has negative bounds and is not the [0, {WHOLE_SHARD_END}] sentinel"
            ));
        };
        FileRange::bounded(start_idx, end_idx)
            .ok_or_else(|| format!("file range [{start}, {end}] must satisfy start < end"))
    }
}

impl From<FileRange> for [i64; 2] {
    fn from(range: FileRange) -> Self {
        match range {
            FileRange::Bounded { start, end } => [start as i64, end as i64],
            FileRange::Whole => [0, WHOLE_SHARD_END],
        }
    }
}

impl fmt::Display for FileRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRange::Bounded { start, end } => write!(f, "[{start}, {end})"),
            FileRange::Whole => write!(f, "[0, {WHOLE_SHARD_END}]"),
        }
    }
}

/// Progress a worker reports for a leased task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaseStatus {
    /// Work is underway.
    Processing,
    /// Work finished successfully.
    Success,
    /// Work failed.
    Fail,
}

/// A worker's hold on a task.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Lease {
    /// Identifier of the worker holding the task.
    pub key: WorkerKey,
    /// Last status the worker reported.
    pub status: LeaseStatus,
}

/// Claim slot of a task. Serialized as `null` when unclaimed, otherwise as the
/// lease object.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "Option<Lease>", into = "Option<Lease>")]
pub enum Claim {
    /// No worker holds the task.
    #[default]
    Unclaimed,
    /// A worker holds the task.
    Leased(Lease),
}

impl Claim {
    /// The lease, if any.
    pub fn lease(&self) -> Option<&Lease> {
        match self {
            Claim::Unclaimed => None,
            Claim::Leased(lease) => Some(lease),
        }
    }
}

impl From<Option<Lease>> for Claim {
    fn from(value: Option<Lease>) -> Self {
        value.map_or(Claim::Unclaimed, Claim::Leased)
    }
}

impl From<Claim> for Option<Lease> {
    fn from(claim: Claim) -> Self {
        match claim {
            Claim::Unclaimed => None,
            Claim::Leased(lease) => Some(lease),
        }
    }
}

/// Natural key of a task; unique within a manifest.
pub type TaskKey = (ShardDir, FileRange);

/// One assignable unit of work: a file range within a shard directory plus its
/// claim slot.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Directory whose files the task covers.
    pub shard_dir: ShardDir,
    /// Index range into the directory's file listing.
    pub file_range: FileRange,
    /// Claim slot; only the external claim protocol changes it after creation.
    #[serde(default)]
    pub worker: Claim,
}

impl Task {
    /// Fresh task with an empty claim slot.
    pub fn unclaimed(shard_dir: ShardDir, file_range: FileRange) -> Self {
        Self {
            shard_dir,
            file_range,
            worker: Claim::Unclaimed,
        }
    }

    /// Natural key `(shard_dir, file_range)`.
    pub fn key(&self) -> TaskKey {
        (self.shard_dir.clone(), self.file_range)
    }

    /// True when a worker holds this task.
    pub fn is_claimed(&self) -> bool {
        matches!(self.worker, Claim::Leased(_))
    }
}
