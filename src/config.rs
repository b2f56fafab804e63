use std::collections::HashMap;
use std::fmt;
use std::num::NonZeroUsize;
use std::str::FromStr;

use crate::constants::manifest::WHOLE_SHARD_END;
use crate::constants::modes::{DEDUP_SUB_PATH, MODE_DEDUP, MODE_PROCESS};
use crate::constants::resolver::DEFAULT_SHARD_MARKER;
use crate::errors::AssignError;
use crate::storage::StoragePath;
use crate::task::ShardDir;
use crate::types::ModeName;

/// Maximum number of files assigned to one task.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ChunkSize {
    /// One task per shard covering every file (`-1` on the command line).
    #[default]
    Unbounded,
    /// At most this many files per task.
    Fixed(NonZeroUsize),
}

impl ChunkSize {
    /// Interpret the signed form used by manifests and the command line.
    ///
    /// `-1` means unbounded; positive values are fixed sizes. Zero and other
    /// negatives are rejected.
    pub fn from_signed(value: i64) -> Result<Self, AssignError> {
        if value == WHOLE_SHARD_END {
            return Ok(ChunkSize::Unbounded);
        }
        usize::try_from(value)
            .ok()
            .and_then(NonZeroUsize::new)
            .map(ChunkSize::Fixed)
            .ok_or_else(|| {
                AssignError::Configuration(format!(
                    "chunk size must be a positive integer or {WHOLE_SHARD_END}, got {value}"
                ))
            })
    }

    /// Signed form, `-1` for unbounded.
    pub fn as_signed(&self) -> i64 {
        match self {
            ChunkSize::Unbounded => WHOLE_SHARD_END,
            ChunkSize::Fixed(size) => size.get() as i64,
        }
    }
}

impl FromStr for ChunkSize {
    type Err = AssignError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let value = raw.trim().parse::<i64>().map_err(|_| {
            AssignError::Configuration(format!("could not parse chunk size '{raw}' as an integer"))
        })?;
        Self::from_signed(value)
    }
}

impl fmt::Display for ChunkSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_signed())
    }
}

/// Where a discovered shard's files live, and how the shard is recorded in
/// task records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardLocation {
    /// Prefix the chunker lists to count files.
    pub listing_path: StoragePath,
    /// Value written to each task's `shard_dir`.
    pub shard_dir: ShardDir,
}

/// Per-mode rewrite applied to every discovered shard directory.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathTransform {
    sub_path: Option<String>,
    wrap_in_list: bool,
}

impl PathTransform {
    /// Leave shard directories untouched.
    pub fn identity() -> Self {
        Self::default()
    }

    /// Descend into `sub_path` below each shard directory.
    pub fn with_sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    /// Record the shard directory as a one-element list.
    pub fn with_list_wrap(mut self, wrap_in_list: bool) -> Self {
        self.wrap_in_list = wrap_in_list;
        self
    }

    /// Apply the transform to one discovered shard directory.
    ///
    /// Nested sub-paths are always returned in directory form so that
    /// listing them cannot match sibling prefixes that share a name stem.
    pub fn apply(&self, shard: &StoragePath) -> ShardLocation {
        let listing_path = match &self.sub_path {
            Some(sub_path) => shard.join(sub_path).as_dir(),
            None => shard.clone(),
        };
        let rendered = listing_path.to_string();
        let shard_dir = if self.wrap_in_list {
            ShardDir::Wrapped(vec![rendered])
        } else {
            ShardDir::Path(rendered)
        };
        ShardLocation {
            listing_path,
            shard_dir,
        }
    }
}

/// Mapping from processing-mode name to the path transform it uses.
///
/// The default registry knows `process` (identity) and `dedup` (descend into
/// `processed_data/` and record the path as a list). Callers may register
/// further modes.
#[derive(Clone, Debug)]
pub struct ModeRegistry {
    modes: HashMap<ModeName, PathTransform>,
}

impl Default for ModeRegistry {
    fn default() -> Self {
        Self::empty()
            .with_mode(MODE_PROCESS, PathTransform::identity())
            .with_mode(
                MODE_DEDUP,
                PathTransform::identity()
                    .with_sub_path(DEDUP_SUB_PATH)
                    .with_list_wrap(true),
            )
    }
}

impl ModeRegistry {
    /// Registry with no modes.
    pub fn empty() -> Self {
        Self {
            modes: HashMap::new(),
        }
    }

    /// Register (or replace) a mode.
    pub fn register(&mut self, name: impl Into<ModeName>, transform: PathTransform) {
        self.modes.insert(name.into(), transform);
    }

    /// Builder-style [`ModeRegistry::register`].
    pub fn with_mode(mut self, name: impl Into<ModeName>, transform: PathTransform) -> Self {
        self.register(name, transform);
        self
    }

    /// Look up a mode's transform.
    pub fn get(&self, name: &str) -> Result<&PathTransform, AssignError> {
        self.modes.get(name).ok_or_else(|| {
            AssignError::Configuration(format!(
                "unknown processing mode '{name}' (known: {})",
                self.names().join(", ")
            ))
        })
    }

    /// Registered mode names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.modes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Parameters for one manifest build.
#[derive(Clone, Debug)]
pub struct AssignConfig {
    /// Root prefix whose immediate children are candidate shard directories.
    pub parent_dir: StoragePath,
    /// Object path the manifest is written to.
    pub tasks_file_path: StoragePath,
    /// Files per task.
    pub chunk_size: ChunkSize,
    /// Processing mode name, resolved through `modes`.
    pub mode: ModeName,
    /// Substring a child prefix must contain to count as a shard directory.
    pub shard_marker: String,
    /// Known processing modes.
    pub modes: ModeRegistry,
}

impl AssignConfig {
    /// Config with default chunk size (unbounded), mode (`process`), and marker.
    pub fn new(parent_dir: StoragePath, tasks_file_path: StoragePath) -> Self {
        Self {
            parent_dir,
            tasks_file_path,
            chunk_size: ChunkSize::default(),
            mode: MODE_PROCESS.to_string(),
            shard_marker: DEFAULT_SHARD_MARKER.to_string(),
            modes: ModeRegistry::default(),
        }
    }

    /// Set the chunk size.
    pub fn with_chunk_size(mut self, chunk_size: ChunkSize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Set the processing mode.
    pub fn with_mode(mut self, mode: impl Into<ModeName>) -> Self {
        self.mode = mode.into();
        self
    }

    /// Set the shard-directory marker substring.
    pub fn with_shard_marker(mut self, marker: impl Into<String>) -> Self {
        self.shard_marker = marker.into();
        self
    }

    /// Replace the mode registry.
    pub fn with_modes(mut self, modes: ModeRegistry) -> Self {
        self.modes = modes;
        self
    }

    /// Transform for the configured mode.
    pub fn transform(&self) -> Result<&PathTransform, AssignError> {
        self.modes.get(&self.mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(raw: &str) -> StoragePath {
        StoragePath::parse(raw).unwrap()
    }

    #[test]
    fn chunk_size_parses_sentinel_and_positive_values() {
        assert_eq!("-1".parse::<ChunkSize>().unwrap(), ChunkSize::Unbounded);
        assert_eq!(
            " 100 ".parse::<ChunkSize>().unwrap(),
            ChunkSize::Fixed(NonZeroUsize::new(100).unwrap())
        );
        assert_eq!(ChunkSize::default().as_signed(), -1);
        assert_eq!(ChunkSize::from_signed(50).unwrap().to_string(), "50");
    }

    #[test]
    fn chunk_size_rejects_zero_and_other_negatives() {
        for raw in ["0", "-2", "abc", ""] {
            assert!(
                matches!(raw.parse::<ChunkSize>(), Err(AssignError::Configuration(_))),
                "'{raw}' should be rejected"
            );
        }
    }

    #[test]
    fn process_mode_keeps_shard_directory() {
        let registry = ModeRegistry::default();
        let shard = path("oss://b/root/CC-MAIN-01_DCLM_sub_by_keywords/");
        let location = registry.get(MODE_PROCESS).unwrap().apply(&shard);
        assert_eq!(location.listing_path, shard);
        assert_eq!(
            location.shard_dir,
            ShardDir::Path("oss://b/root/CC-MAIN-01_DCLM_sub_by_keywords/".to_string())
        );
    }

    #[test]
    fn dedup_mode_descends_and_wraps() {
        let registry = ModeRegistry::default();
        let shard = path("oss://b/root/CC-MAIN-01_DCLM_sub_by_keywords/");
        let location = registry.get(MODE_DEDUP).unwrap().apply(&shard);
        assert_eq!(
            location.listing_path.key(),
            "root/CC-MAIN-01_DCLM_sub_by_keywords/processed_data/"
        );
        assert_eq!(
            location.shard_dir,
            ShardDir::Wrapped(vec![
                "oss://b/root/CC-MAIN-01_DCLM_sub_by_keywords/processed_data/".to_string()
            ])
        );
    }

    #[test]
    fn custom_modes_can_be_registered() {
        let config = AssignConfig::new(path("oss://b/root/"), path("oss://b/tasks.json"))
            .with_modes(
                ModeRegistry::default()
                    .with_mode("score", PathTransform::identity().with_sub_path("scored")),
            )
            .with_mode("score");
        let location = config
            .transform()
            .unwrap()
            .apply(&path("oss://b/root/shard/"));
        assert_eq!(location.listing_path.key(), "root/shard/scored/");
        assert!(matches!(location.shard_dir, ShardDir::Path(_)));
    }

    #[test]
    fn unknown_mode_is_a_configuration_error() {
        let config = AssignConfig::new(path("oss://b/root/"), path("oss://b/tasks.json"))
            .with_mode("nope");
        let err = config.transform().unwrap_err();
        assert!(err.to_string().contains("dedup, process"));
    }
}
