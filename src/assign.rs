use tracing::info;

use crate::chunker::Chunker;
use crate::config::AssignConfig;
use crate::errors::AssignError;
use crate::manifest::{Manifest, ManifestBuilder, ManifestWriter, WriteOutcome};
use crate::resolver::DirectoryResolver;
use crate::storage::ObjectStore;

/// Summary of one manifest build.
#[derive(Clone, Debug)]
pub struct AssignReport {
    /// Shard directories discovered under the parent directory.
    pub shard_count: usize,
    /// The manifest that was built (and handed to the writer).
    pub manifest: Manifest,
    /// Result of writing and verifying the manifest.
    pub outcome: WriteOutcome,
}

impl AssignReport {
    /// Number of tasks in the manifest.
    pub fn task_count(&self) -> usize {
        self.manifest.len()
    }

    /// True when the manifest was written and verified.
    pub fn is_success(&self) -> bool {
        self.outcome.is_success()
    }
}

/// Resolve shards, chunk them, and build the manifest without writing it.
///
/// Any storage failure aborts the whole plan.
pub fn plan_tasks<S>(store: &S, config: &AssignConfig) -> Result<Manifest, AssignError>
where
    S: ObjectStore + ?Sized,
{
    build_plan(store, config).map(|(_, manifest)| manifest)
}

fn build_plan<S>(store: &S, config: &AssignConfig) -> Result<(usize, Manifest), AssignError>
where
    S: ObjectStore + ?Sized,
{
    let transform = config.transform()?.clone();
    let resolver =
        DirectoryResolver::new(store, config.shard_marker.as_str()).with_transform(transform);
    let chunker = Chunker::new(store, config.chunk_size);

    let locations = resolver.resolve(&config.parent_dir)?;
    let mut builder = ManifestBuilder::new();
    for location in &locations {
        let ranges = chunker.ranges_for(location)?;
        builder.push_shard(&location.shard_dir, &ranges);
    }
    Ok((locations.len(), builder.build()))
}

/// Build the manifest for `config` and write it to `config.tasks_file_path`.
///
/// Discovery failures are returned as errors; write and verification failures
/// are reported through [`AssignReport::outcome`]. The target is overwritten
/// unconditionally, so any claim state recorded in a previous manifest is lost.
pub fn assign_tasks<S>(store: &S, config: &AssignConfig) -> Result<AssignReport, AssignError>
where
    S: ObjectStore + ?Sized,
{
    info!(
        parent_dir = %config.parent_dir,
        tasks_file_path = %config.tasks_file_path,
        mode = %config.mode,
        chunk_size = %config.chunk_size,
        "assigning tasks"
    );
    let (shard_count, manifest) = build_plan(store, config)?;
    let outcome = ManifestWriter::new(store).write(&manifest, &config.tasks_file_path)?;
    Ok(AssignReport {
        shard_count,
        manifest,
        outcome,
    })
}
