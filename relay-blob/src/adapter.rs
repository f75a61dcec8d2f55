use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::{
    chunk_stream, sanitize_file_name, ByteRange, ByteStream, FileId, FileManifest, ListQuery,
    ManifestPage, ManifestStore, OpenedFile, PartBlobClient, PartUploader, RangeReassembler,
    RangeResolver, RelayConfig, RelayError, RelayResult,
};

/// The main relay adapter - what HTTP handlers (or any other transport) embed
#[derive(Clone)]
pub struct RelayAdapter {
    parts: Arc<dyn PartBlobClient>,
    manifests: Arc<dyn ManifestStore>,
    config: RelayConfig,
}

impl RelayAdapter {
    /// Create a new relay adapter
    pub fn new<P, M>(parts: P, manifests: M, config: RelayConfig) -> Self
    where
        P: PartBlobClient + 'static,
        M: ManifestStore + 'static,
    {
        Self::from_shared(Arc::new(parts), Arc::new(manifests), config)
    }

    /// Create from collaborators that are already shared
    pub fn from_shared(
        parts: Arc<dyn PartBlobClient>,
        manifests: Arc<dyn ManifestStore>,
        config: RelayConfig,
    ) -> Self {
        Self {
            parts,
            manifests,
            config,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Chunk `body`, upload its parts in order and persist the manifest.
    ///
    /// Nothing is saved unless every part was accepted.
    #[instrument(skip(self, body))]
    pub async fn put(&self, file_name: &str, body: ByteStream) -> RelayResult<FileManifest> {
        self.config.validate()?;
        let file_name = sanitize_file_name(file_name)
            .ok_or_else(|| RelayError::invalid("fileName is required"))?;

        let rules = &self.config.chunk_rules;
        let chunk_size = usize::try_from(rules.chunk_size)
            .map_err(|_| RelayError::invalid("chunk_size does not fit in memory"))?;

        let uploaded = PartUploader::new(self.parts.clone(), file_name.clone())
            .with_queue_depth(rules.upload_queue_depth)
            .with_max_file_bytes(self.config.max_file_bytes)
            .upload(chunk_stream(body, chunk_size))
            .await?;

        let manifest = FileManifest::new(
            FileId::new(),
            file_name,
            rules.chunk_size,
            uploaded.file_size,
            uploaded.parts,
        )?;

        self.manifests.save(&manifest).await.map_err(|e| match e {
            RelayError::Persist { .. } => e,
            other => RelayError::persist(other.to_string()),
        })?;

        info!(
            file_id = %manifest.file_id,
            file_name = %manifest.file_name,
            file_size = manifest.file_size,
            parts = manifest.parts.len(),
            "file stored"
        );
        Ok(manifest)
    }

    /// Open a stored file, or the requested range of it, for streaming.
    ///
    /// Every check that can fail the request happens before the returned
    /// stream starts pulling parts.
    #[instrument(skip(self))]
    pub async fn open(&self, file_id: &str, range: Option<ByteRange>) -> RelayResult<OpenedFile> {
        let manifest = self
            .manifests
            .find_one(file_id)
            .await?
            .ok_or_else(|| RelayError::not_found(file_id))?;
        manifest.validate()?;

        let resolved = RangeResolver::new(&manifest, self.config.range_window_bytes).resolve(range)?;
        debug!(
            start = resolved.start,
            end = resolved.end,
            parts = resolved.slices.len(),
            "range resolved"
        );

        let content = RangeReassembler::new(self.parts.clone(), &manifest, &resolved)
            .into_body_stream(self.config.download_buffer);

        Ok(OpenedFile {
            manifest,
            range: resolved,
            content,
        })
    }

    /// One page of stored manifests
    #[instrument(skip(self))]
    pub async fn list(&self, query: &ListQuery) -> RelayResult<ManifestPage> {
        let (data, total) = self
            .manifests
            .find(&query.filter(), query.limit(), query.skip())
            .await?;
        Ok(ManifestPage::new(query, data, total))
    }
}
