use std::env;
use std::error::Error;
use std::path::PathBuf;

use clap::{Parser, error::ErrorKind};

use crate::assign::{AssignReport, assign_tasks};
use crate::config::{AssignConfig, ChunkSize};
use crate::constants::cli::STORE_ROOT_ENV;
use crate::constants::modes::MODE_PROCESS;
use crate::constants::resolver::DEFAULT_SHARD_MARKER;
use crate::storage::{LocalStore, StoragePath};

#[derive(Debug, Parser)]
#[command(
    name = "assign_tasks",
    disable_help_subcommand = true,
    about = "Split shard directories into a task manifest",
    long_about = "List shard directories under a parent prefix, split each shard's files into fixed-size ranges, and write the resulting task manifest as JSON.",
    after_help = "Rebuilding a manifest replaces it entirely; claim state recorded by workers in the previous manifest is discarded."
)]
/// CLI for `assign_tasks`.
///
/// Common usage:
/// - Whole-shard tasks: `--parent-dir oss://bucket/dclm/origin/ --tasks-file-path oss://bucket/dclm/process_tasks.json`
/// - 100 files per task: add `--chunk-size 100`
/// - Nested processed data: add `--mode dedup`
struct AssignTasksCli {
    #[arg(
        long = "parent-dir",
        value_name = "URI",
        value_parser = parse_storage_path,
        help = "Prefix whose child directories are the candidate shards"
    )]
    parent_dir: StoragePath,
    #[arg(
        long = "tasks-file-path",
        value_name = "URI",
        value_parser = parse_storage_path,
        help = "Object path the manifest is written to"
    )]
    tasks_file_path: StoragePath,
    #[arg(
        long = "chunk-size",
        default_value = "-1",
        allow_negative_numbers = true,
        value_parser = parse_chunk_size,
        help = "Files per task, or -1 for one task per shard"
    )]
    chunk_size: ChunkSize,
    #[arg(
        long,
        default_value = MODE_PROCESS,
        help = "Processing mode (process or dedup)"
    )]
    mode: String,
    #[arg(
        long = "shard-marker",
        default_value = DEFAULT_SHARD_MARKER,
        help = "Substring a child directory must contain to be treated as a shard"
    )]
    shard_marker: String,
    #[arg(
        long = "store-root",
        value_name = "DIR",
        help = "Local directory backing the object store (buckets are subdirectories); falls back to SHARD_TASKS_STORE_ROOT"
    )]
    store_root: Option<PathBuf>,
}

/// Run the `assign_tasks` command with `args_iter` (program name excluded).
///
/// Prints the success/failure report line and returns the report, or `None`
/// when only help or version output was requested. Discovery and
/// configuration failures are returned as errors; a failed manifest write is
/// a report whose outcome is not successful.
pub fn run_assign_tasks<I>(args_iter: I) -> Result<Option<AssignReport>, Box<dyn Error>>
where
    I: Iterator<Item = String>,
{
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init();

    let Some(cli) =
        parse_cli::<AssignTasksCli, _>(std::iter::once("assign_tasks".to_string()).chain(args_iter))?
    else {
        return Ok(None);
    };

    let store_root = resolve_store_root(cli.store_root)?;
    let store = LocalStore::new(store_root);
    let config = AssignConfig::new(cli.parent_dir, cli.tasks_file_path)
        .with_chunk_size(cli.chunk_size)
        .with_mode(cli.mode)
        .with_shard_marker(cli.shard_marker);

    let report = assign_tasks(&store, &config)?;
    println!("{}", report.outcome);
    Ok(Some(report))
}

fn resolve_store_root(explicit: Option<PathBuf>) -> Result<PathBuf, Box<dyn Error>> {
    let root = match explicit {
        Some(root) => root,
        None => match env::var_os(STORE_ROOT_ENV) {
            Some(value) if !value.is_empty() => PathBuf::from(value),
            _ => {
                return Err(format!(
                    "no object store configured: pass --store-root or set {STORE_ROOT_ENV}"
                )
                .into());
            }
        },
    };
    if !root.is_dir() {
        return Err(format!("Directory not found: {}", root.display()).into());
    }
    Ok(root)
}

fn parse_storage_path(raw: &str) -> Result<StoragePath, String> {
    StoragePath::parse(raw).map_err(|err| err.to_string())
}

fn parse_chunk_size(raw: &str) -> Result<ChunkSize, String> {
    raw.parse::<ChunkSize>().map_err(|err| err.to_string())
}

fn parse_cli<T, I>(args: I) -> Result<Option<T>, Box<dyn Error>>
where
    T: Parser,
    I: IntoIterator,
    I::Item: Into<std::ffi::OsString> + Clone,
{
    match T::try_parse_from(args) {
        Ok(cli) => Ok(Some(cli)),
        Err(err) => match err.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => {
                err.print()?;
                Ok(None)
            }
            _ => Err(err.into()),
        },
    }
}
