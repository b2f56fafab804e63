use std::fs;
use std::path::Path;

use shard_tasks::{
    AssignConfig, AssignError, ChunkSize, FileRange, LocalStore, Manifest, ShardDir,
    StorageError, StoragePath, assign_tasks, plan_tasks,
};
use tempfile::tempdir;

fn write_files(dir: &Path, count: usize) {
    fs::create_dir_all(dir).unwrap();
    for idx in 0..count {
        fs::write(dir.join(format!("part-{idx:05}.jsonl.zst")), b"payload").unwrap();
    }
}

fn path(raw: &str) -> StoragePath {
    StoragePath::parse(raw).unwrap()
}

#[test]
fn builds_and_writes_manifest_from_directory_tree() {
    let temp = tempdir().unwrap();
    let origin = temp.path().join("corpus/dclm/origin");
    write_files(&origin.join("CC-MAIN-2014-41_DCLM_sub_by_keywords"), 7);
    write_files(&origin.join("CC-MAIN-2014-49_DCLM_sub_by_keywords"), 3);
    write_files(&origin.join("CC-MAIN-2014-52_unfiltered"), 4);

    let store = LocalStore::new(temp.path());
    let config = AssignConfig::new(
        path("oss://corpus/dclm/origin/"),
        path("oss://corpus/dclm/process_tasks.json"),
    )
    .with_chunk_size(ChunkSize::from_signed(3).unwrap());

    let report = assign_tasks(&store, &config).unwrap();
    assert!(report.is_success());
    assert_eq!(report.shard_count, 2);
    assert_eq!(report.task_count(), 4);

    let body = fs::read(temp.path().join("corpus/dclm/process_tasks.json")).unwrap();
    let manifest = Manifest::from_json(&body).unwrap();
    assert_eq!(manifest, report.manifest);
    assert_eq!(
        manifest.tasks[3].shard_dir,
        ShardDir::Path("oss://corpus/dclm/origin/CC-MAIN-2014-49_DCLM_sub_by_keywords/".to_string())
    );
    assert_eq!(manifest.tasks[3].file_range, FileRange::Bounded { start: 0, end: 3 });
}

#[test]
fn manifest_written_under_parent_dir_is_not_mistaken_for_a_shard() {
    let temp = tempdir().unwrap();
    let origin = temp.path().join("corpus/origin");
    write_files(&origin.join("CC-01_DCLM_sub_by_keywords"), 2);

    let store = LocalStore::new(temp.path());
    let config = AssignConfig::new(
        path("oss://corpus/origin/"),
        path("oss://corpus/origin/tasks.json"),
    );

    let first = assign_tasks(&store, &config).unwrap();
    let second = assign_tasks(&store, &config).unwrap();
    assert_eq!(first.manifest, second.manifest);
    assert_eq!(second.task_count(), 1);
    assert!(second.manifest.tasks[0].file_range.is_whole());
}

#[test]
fn missing_bucket_is_a_discovery_error() {
    let temp = tempdir().unwrap();
    let store = LocalStore::new(temp.path());
    let config = AssignConfig::new(path("oss://absent/origin/"), path("oss://absent/tasks.json"));
    let err = assign_tasks(&store, &config).unwrap_err();
    assert!(matches!(err, AssignError::Storage(StorageError::NotFound { .. })));
    assert!(!temp.path().join("absent/tasks.json").exists());
}

#[cfg(unix)]
#[test]
fn shard_count_includes_tmp_named_and_symlinked_files() {
    let temp = tempdir().unwrap();
    let shard = temp.path().join("corpus/origin/CC-01_DCLM_sub_by_keywords");
    fs::create_dir_all(&shard).unwrap();
    fs::write(shard.join("a.jsonl"), "{}").unwrap();
    fs::write(shard.join("b.jsonl"), "{}").unwrap();
    fs::write(shard.join("c.tmp"), "{}").unwrap();
    fs::write(temp.path().join("linked.jsonl"), "{}").unwrap();
    std::os::unix::fs::symlink(temp.path().join("linked.jsonl"), shard.join("d.jsonl")).unwrap();

    let store = LocalStore::new(temp.path());
    let config = AssignConfig::new(path("oss://corpus/origin/"), path("oss://corpus/tasks.json"))
        .with_chunk_size(ChunkSize::from_signed(10).unwrap());
    let manifest = plan_tasks(&store, &config).unwrap();
    assert_eq!(manifest.len(), 1);
    assert_eq!(manifest.tasks[0].file_range, FileRange::Bounded { start: 0, end: 4 });
}

#[cfg(target_os = "linux")]
#[test]
fn non_utf8_file_name_fails_instead_of_being_skipped() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let temp = tempdir().unwrap();
    let shard = temp.path().join("corpus/origin/CC-01_DCLM_sub_by_keywords");
    write_files(&shard, 2);
    fs::write(shard.join(OsStr::from_bytes(b"bad-\xff.jsonl")), "{}").unwrap();

    let store = LocalStore::new(temp.path());
    let config = AssignConfig::new(path("oss://corpus/origin/"), path("oss://corpus/tasks.json"))
        .with_chunk_size(ChunkSize::from_signed(10).unwrap());
    let err = plan_tasks(&store, &config).unwrap_err();
    assert!(matches!(err, AssignError::Storage(StorageError::InvalidPath { .. })));
}
