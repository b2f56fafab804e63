use std::error::Error;

use shard_tasks::{AssignConfig, ChunkSize, MemoryStore, StoragePath, assign_tasks};

fn seeded_store(root: &StoragePath) -> MemoryStore {
    let shards = [
        ("CC-MAIN-2014-41_DCLM_sub_by_keywords/", 250),
        ("CC-MAIN-2014-49_DCLM_sub_by_keywords/", 0),
        ("CC-MAIN-2014-51_DCLM_sub_by_keywords/", 42),
        ("CC-MAIN-2014-52_unfiltered/", 17),
    ];
    let mut store = MemoryStore::new();
    for (shard, files) in shards {
        let dir = root.join(shard);
        store = store.with_object(&dir, "");
        for idx in 0..files {
            store = store.with_object(&dir.join(&format!("part-{idx:05}.jsonl.zst")), "{}");
        }
    }
    store
}

fn main() -> Result<(), Box<dyn Error>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    let root = StoragePath::parse("oss://corpus/dclm/origin/")?;
    let store = seeded_store(&root);
    let config = AssignConfig::new(root, StoragePath::parse("oss://corpus/dclm/process_tasks.json")?)
        .with_chunk_size(ChunkSize::from_signed(100)?);

    let report = assign_tasks(&store, &config)?;
    println!("{}", report.outcome);
    println!(
        "{} shard(s) resolved, {} task(s) planned",
        report.shard_count,
        report.task_count()
    );
    if let Some(body) = store.object(&config.tasks_file_path) {
        println!("{}", String::from_utf8_lossy(&body));
    }
    Ok(())
}
