use std::path::PathBuf;

/// Default in-memory budget for file parts of one form: 32 MB
pub const DEFAULT_MAX_MEMORY: usize = 32 * 1024 * 1024;

/// Default budget for non-file form values: 10 MB
pub const DEFAULT_MAX_VALUE_BYTES: usize = 10 * 1024 * 1024;

/// Tuning knobs for multipart parsing and directory creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadConfig {
    /// Bytes of file content kept in memory across one form before parts
    /// spill to temp files (default: 32 MB)
    pub max_memory: usize,

    /// Total bytes allowed for non-file text values (default: 10 MB)
    pub max_value_bytes: usize,

    /// Hard cap on the whole multipart stream, if any (default: unlimited)
    pub max_request_size: Option<u64>,

    /// Where spilled parts are written (default: system temp dir)
    pub temp_dir: Option<PathBuf>,

    /// Mode for directories created on unix, before umask (default: 0o777)
    pub directory_mode: u32,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_memory: DEFAULT_MAX_MEMORY,
            max_value_bytes: DEFAULT_MAX_VALUE_BYTES,
            max_request_size: None,
            temp_dir: None,
            directory_mode: 0o777,
        }
    }
}

impl UploadConfig {
    /// Same as default but with a different in-memory threshold
    pub fn with_max_memory(max_memory: usize) -> Self {
        Self {
            max_memory,
            ..Self::default()
        }
    }
}
