use async_trait::async_trait;
use bytes::Bytes;

use crate::{ByteStream, FileManifest, RelayResult};

/// Remote host that keeps individual parts - must be implemented by all part backends
#[async_trait]
pub trait PartBlobClient: Send + Sync {
    /// Store one part under `name`, returning a stable URL that supports range reads
    async fn put(&self, name: &str, bytes: Bytes) -> RelayResult<String>;

    /// Stream the inclusive byte range `start..=end` of the part at `url`
    async fn get_range(&self, url: &str, start: u64, end: u64) -> RelayResult<ByteStream>;
}

/// Persistence for file manifests
#[async_trait]
pub trait ManifestStore: Send + Sync {
    /// Persist a complete manifest
    async fn save(&self, manifest: &FileManifest) -> RelayResult<()>;

    /// Look up a manifest by file id
    async fn find_one(&self, file_id: &str) -> RelayResult<Option<FileManifest>>;

    /// List manifests matching `filter`, returning one page and the total match count
    async fn find(
        &self,
        filter: &ManifestFilter,
        limit: u64,
        skip: u64,
    ) -> RelayResult<(Vec<FileManifest>, u64)>;
}

/// Exact-match filter for manifest listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ManifestFilter {
    pub file_id: Option<String>,
    pub file_name: Option<String>,
}

impl ManifestFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file_id<S: Into<String>>(mut self, file_id: S) -> Self {
        self.file_id = Some(file_id.into());
        self
    }

    pub fn with_file_name<S: Into<String>>(mut self, file_name: S) -> Self {
        self.file_name = Some(file_name.into());
        self
    }

    pub fn matches(&self, manifest: &FileManifest) -> bool {
        self.file_id.as_deref().map_or(true, |id| manifest.file_id == id)
            && self
                .file_name
                .as_deref()
                .map_or(true, |name| manifest.file_name == name)
    }
}

/// Apply skip/limit to an already filtered, ordered result set
pub(crate) fn paginate(matching: Vec<FileManifest>, limit: u64, skip: u64) -> (Vec<FileManifest>, u64) {
    let total = matching.len() as u64;
    let page = matching
        .into_iter()
        .skip(usize::try_from(skip).unwrap_or(usize::MAX))
        .take(usize::try_from(limit).unwrap_or(usize::MAX))
        .collect();
    (page, total)
}
