/// Constants describing object-store path layout.
pub mod storage {
    /// Separator between key components; keys ending in it are directory markers.
    pub const PATH_SEPARATOR: char = '/';
    /// Separator between a URI scheme and the bucket name.
    pub const SCHEME_SEPARATOR: &str = "://";
    /// Suffix of the hidden staging file a local write goes through.
    pub const LOCAL_TEMP_SUFFIX: &str = ".tmp";
}

/// Constants used by shard directory discovery.
pub mod resolver {
    /// Marker substring an upstream stage places in every shard directory name.
    pub const DEFAULT_SHARD_MARKER: &str = "DCLM_sub_by_keywords";
}

/// Constants used by processing modes.
pub mod modes {
    /// Mode that consumes discovered shard directories as-is.
    pub const MODE_PROCESS: &str = "process";
    /// Mode that consumes the nested data directory of each shard.
    pub const MODE_DEDUP: &str = "dedup";
    /// Nested directory holding processed files for the dedup mode.
    pub const DEDUP_SUB_PATH: &str = "processed_data";
}

/// Constants used by manifest encoding.
pub mod manifest {
    /// Sentinel range end meaning "the whole shard".
    pub const WHOLE_SHARD_END: i64 = -1;
    /// Indentation used for the pretty-printed manifest document.
    pub const MANIFEST_INDENT: &[u8] = b"    ";
}

/// Constants used by the command-line entry point.
pub mod cli {
    /// Environment variable selecting the local store root when `--store-root` is absent.
    pub const STORE_ROOT_ENV: &str = "SHARD_TASKS_STORE_ROOT";
}
