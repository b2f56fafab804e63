/// Full storage path string including scheme and bucket.
/// Example: `oss://corpus-bucket/dclm/origin/CC-MAIN-2014-51_DCLM_sub_by_keywords/`
pub type PathString = String;
/// Bucket-relative object key.
/// Example: `dclm/origin/CC-MAIN-2014-51_DCLM_sub_by_keywords/part-00001.jsonl.zst`
pub type ObjectKey = String;
/// Identifier a worker writes into a lease when it claims a task.
/// Example: `192.168.0.2_828282`
pub type WorkerKey = String;
/// Name of a processing mode used to select a shard path transform.
/// Examples: `process`, `dedup`
pub type ModeName = String;
