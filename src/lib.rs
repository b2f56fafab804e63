#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

/// Shard discovery, chunking, and manifest writing composed into one build.
pub mod assign;
/// Range arithmetic and per-shard file listing.
pub mod chunker;
/// Command-line entry point for manifest builds.
pub mod cli;
/// Build configuration: chunk size, processing modes, path transforms.
pub mod config;
/// Centralized constants used across storage, discovery, and manifests.
pub mod constants;
/// Manifest model, builder, and writer.
pub mod manifest;
/// Shard directory discovery.
pub mod resolver;
/// Object-store capability and built-in backends.
pub mod storage;
/// Task records and claim slots.
pub mod task;
/// Shared type aliases.
pub mod types;

mod errors;

pub use assign::{AssignReport, assign_tasks, plan_tasks};
pub use chunker::{Chunker, chunk_ranges};
pub use config::{AssignConfig, ChunkSize, ModeRegistry, PathTransform, ShardLocation};
pub use errors::{AssignError, StorageError};
pub use manifest::{Manifest, ManifestBuilder, ManifestWriter, WriteOutcome};
pub use resolver::DirectoryResolver;
pub use storage::{ListMode, Listing, LocalStore, MemoryStore, ObjectStore, StoragePath};
pub use task::{Claim, FileRange, Lease, LeaseStatus, ShardDir, Task, TaskKey};
pub use types::{ModeName, ObjectKey, PathString, WorkerKey};
