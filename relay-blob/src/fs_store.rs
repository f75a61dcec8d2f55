use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::store::paginate;
use crate::{FileManifest, ManifestFilter, ManifestStore, RelayError, RelayResult};

/// Manifest store keeping one JSON document per file in a directory.
///
/// Documents are written to a temporary name and renamed into place, so a
/// reader never observes a half-written manifest.
#[derive(Debug, Clone)]
pub struct FsManifestStore {
    root: PathBuf,
}

impl FsManifestStore {
    /// Open (creating if needed) a manifest directory
    pub async fn open(root: impl Into<PathBuf>) -> RelayResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn document_path(&self, file_id: &str) -> RelayResult<PathBuf> {
        let valid = !file_id.is_empty()
            && file_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(RelayError::invalid(format!("invalid file id: {file_id}")));
        }
        Ok(self.root.join(format!("{file_id}.json")))
    }

    async fn read_document(path: &Path) -> RelayResult<FileManifest> {
        let raw = tokio::fs::read(path).await?;
        Ok(serde_json::from_slice(&raw)?)
    }
}

#[async_trait]
impl ManifestStore for FsManifestStore {
    async fn save(&self, manifest: &FileManifest) -> RelayResult<()> {
        let path = self.document_path(&manifest.file_id)?;
        if tokio::fs::try_exists(&path).await? {
            return Err(RelayError::persist(format!(
                "manifest {} already exists",
                manifest.file_id
            )));
        }

        let tmp = self.root.join(format!(".{}.json.tmp", manifest.file_id));
        let body = serde_json::to_vec_pretty(manifest)?;
        tokio::fs::write(&tmp, body).await?;
        tokio::fs::rename(&tmp, &path).await?;

        debug!(file_id = %manifest.file_id, path = %path.display(), "manifest written");
        Ok(())
    }

    async fn find_one(&self, file_id: &str) -> RelayResult<Option<FileManifest>> {
        let path = match self.document_path(file_id) {
            Ok(path) => path,
            // Ids that cannot name a document cannot exist either.
            Err(_) => return Ok(None),
        };
        match Self::read_document(&path).await {
            Ok(manifest) => Ok(Some(manifest)),
            Err(RelayError::Io { source }) if source.kind() == std::io::ErrorKind::NotFound => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn find(
        &self,
        filter: &ManifestFilter,
        limit: u64,
        skip: u64,
    ) -> RelayResult<(Vec<FileManifest>, u64)> {
        let mut matching = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_document = path.extension().is_some_and(|ext| ext == "json")
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_document {
                continue;
            }
            match Self::read_document(&path).await {
                Ok(manifest) if filter.matches(&manifest) => matching.push(manifest),
                Ok(_) => {}
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable manifest"),
            }
        }

        matching.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.file_id.cmp(&b.file_id))
        });
        Ok(paginate(matching, limit, skip))
    }
}
