use crate::{RelayError, RelayResult};

/// Configuration for chunked storage and reassembly
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Absolute max size allowed for a single file (safety guard)
    pub max_file_bytes: u64,

    /// Rules for cutting uploads into parts
    pub chunk_rules: ChunkRules,

    /// Largest window served for an open-ended range request (`bytes=<start>-`)
    pub range_window_bytes: u64,

    /// Fragments buffered between a reassembly task and its consumer
    pub download_buffer: usize,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 5 * 1024 * 1024 * 1024, // 5GB
            chunk_rules: ChunkRules::default(),
            range_window_bytes: 5 * 1024 * 1024, // 5MB
            download_buffer: 4,
        }
    }
}

/// Rules for fixed-size part uploads
#[derive(Debug, Clone)]
pub struct ChunkRules {
    /// Size of every part except the final one (bytes)
    pub chunk_size: u64,

    /// Finished chunks allowed to wait for upload before ingestion suspends
    pub upload_queue_depth: usize,
}

impl Default for ChunkRules {
    fn default() -> Self {
        Self {
            chunk_size: 8 * 1024 * 1024, // 8MB
            upload_queue_depth: 2,
        }
    }
}

impl RelayConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set max file size
    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// Set chunk rules
    pub fn with_chunk_rules(mut self, rules: ChunkRules) -> Self {
        self.chunk_rules = rules;
        self
    }

    /// Set the open-ended range window
    pub fn with_range_window(mut self, bytes: u64) -> Self {
        self.range_window_bytes = bytes;
        self
    }

    /// Set how many fragments a download may buffer ahead of its consumer
    pub fn with_download_buffer(mut self, fragments: usize) -> Self {
        self.download_buffer = fragments;
        self
    }

    /// Reject settings that would make chunking or reassembly impossible
    pub fn validate(&self) -> RelayResult<()> {
        if self.chunk_rules.chunk_size == 0 {
            return Err(RelayError::invalid("chunk_size must be greater than zero"));
        }
        if usize::try_from(self.chunk_rules.chunk_size).is_err() {
            return Err(RelayError::invalid("chunk_size does not fit in memory on this platform"));
        }
        if self.chunk_rules.upload_queue_depth == 0 {
            return Err(RelayError::invalid("upload_queue_depth must be greater than zero"));
        }
        if self.range_window_bytes == 0 {
            return Err(RelayError::invalid("range_window_bytes must be greater than zero"));
        }
        if self.download_buffer == 0 {
            return Err(RelayError::invalid("download_buffer must be greater than zero"));
        }
        Ok(())
    }
}

impl ChunkRules {
    /// Create new chunk rules
    pub fn new() -> Self {
        Self::default()
    }

    /// Set chunk size
    pub fn with_chunk_size(mut self, bytes: u64) -> Self {
        self.chunk_size = bytes;
        self
    }

    /// Set upload queue depth
    pub fn with_upload_queue_depth(mut self, depth: usize) -> Self {
        self.upload_queue_depth = depth;
        self
    }
}
