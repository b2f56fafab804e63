use tracing::debug;

use crate::config::{ChunkSize, ShardLocation};
use crate::errors::StorageError;
use crate::storage::{ListMode, ObjectStore, StoragePath};
use crate::task::FileRange;
use crate::types::ObjectKey;

/// Split `total` file indices into contiguous ranges of at most `chunk_size`.
///
/// Unbounded chunking always yields the single `[0, -1]` sentinel, even for an
/// empty shard. Fixed chunking yields `[0, c), [c, 2c), ...` with a shorter
/// final range, and nothing at all when `total` is zero.
pub fn chunk_ranges(total: usize, chunk_size: ChunkSize) -> Vec<FileRange> {
    let size = match chunk_size {
        ChunkSize::Unbounded => return vec![FileRange::Whole],
        ChunkSize::Fixed(size) => size.get(),
    };
    (0..total)
        .step_by(size)
        .map(|start| FileRange::Bounded {
            start,
            end: start.saturating_add(size).min(total),
        })
        .collect()
}

/// Lists a shard's files and partitions them into task ranges.
pub struct Chunker<'a, S: ObjectStore + ?Sized> {
    store: &'a S,
    chunk_size: ChunkSize,
}

impl<'a, S: ObjectStore + ?Sized> Chunker<'a, S> {
    /// Chunker using `chunk_size` for every shard.
    pub fn new(store: &'a S, chunk_size: ChunkSize) -> Self {
        Self { store, chunk_size }
    }

    /// Configured chunk size.
    pub fn chunk_size(&self) -> ChunkSize {
        self.chunk_size
    }

    /// File keys under `dir` in listing order, excluding directory markers.
    ///
    /// Task ranges index into exactly this sequence.
    pub fn files(&self, dir: &StoragePath) -> Result<Vec<ObjectKey>, StorageError> {
        let listing = self.store.list(dir, ListMode::Recursive)?;
        Ok(listing.file_keys().cloned().collect())
    }

    /// Ranges for one shard.
    ///
    /// The shard is listed even in unbounded mode so an unreachable shard fails
    /// the same way regardless of chunk size.
    pub fn ranges_for(&self, location: &ShardLocation) -> Result<Vec<FileRange>, StorageError> {
        let total = self.files(&location.listing_path)?.len();
        let ranges = chunk_ranges(total, self.chunk_size);
        debug!(
            shard_dir = %location.shard_dir,
            files = total,
            chunk_size = %self.chunk_size,
            ranges = ranges.len(),
            "chunked shard"
        );
        Ok(ranges)
    }
}
