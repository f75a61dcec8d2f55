use serde::{Deserialize, Serialize};

use crate::{ByteStream, FileManifest, ResolvedRange};

/// Receipt returned to the uploader once the manifest is saved
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadReceipt {
    pub file_id: String,
    pub file_size: u64,
    pub url: String,
    #[serde(rename = "longURL")]
    pub long_url: String,
    #[serde(rename = "downloadURL")]
    pub download_url: String,
    #[serde(rename = "longDownloadURL")]
    pub long_download_url: String,
    /// Part URLs in byte order
    pub parts: Vec<String>,
}

impl UploadReceipt {
    /// Build the public links for `manifest` under `base_url`
    /// (scheme and authority, with or without a trailing slash)
    pub fn new(manifest: &FileManifest, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let url = format!("{base}/v1/file/{}", manifest.file_id);
        let long_url = format!("{url}/{}", manifest.file_name);
        Self {
            file_id: manifest.file_id.clone(),
            file_size: manifest.file_size,
            download_url: format!("{url}?download=1"),
            long_download_url: format!("{long_url}?download=1"),
            url,
            long_url,
            parts: manifest.parts.clone(),
        }
    }
}

/// A file opened for reading: what is being served and the bytes themselves
pub struct OpenedFile {
    pub manifest: FileManifest,
    pub range: ResolvedRange,
    pub content: ByteStream,
}

impl OpenedFile {
    pub fn content_length(&self) -> u64 {
        self.range.content_length()
    }
}

impl std::fmt::Debug for OpenedFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenedFile")
            .field("manifest", &self.manifest)
            .field("range", &self.range)
            .finish_non_exhaustive()
    }
}
