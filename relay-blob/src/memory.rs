//! In-process collaborators, used by tests and the `memory` server backend.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::store::paginate;
use crate::{
    ByteStream, FileManifest, ManifestFilter, ManifestStore, PartBlobClient, RelayError,
    RelayResult,
};

/// Part host that keeps every part in memory.
///
/// Ranged reads are served in fragments of `fragment_size` bytes so consumers
/// see the same multi-fragment delivery a network client produces.
#[derive(Clone)]
pub struct MemoryPartStore {
    parts: Arc<RwLock<HashMap<String, Bytes>>>,
    next_id: Arc<AtomicU64>,
    fragment_size: usize,
}

impl MemoryPartStore {
    pub fn new() -> Self {
        Self {
            parts: Arc::new(RwLock::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            fragment_size: 64 * 1024,
        }
    }

    /// Change the size of fragments yielded by `get_range`
    pub fn with_fragment_size(mut self, bytes: usize) -> Self {
        self.fragment_size = bytes.max(1);
        self
    }

    /// Number of parts currently held
    pub fn len(&self) -> usize {
        self.parts.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.read().is_empty()
    }

    /// Raw bytes of a stored part
    pub fn part(&self, url: &str) -> Option<Bytes> {
        self.parts.read().get(url).cloned()
    }
}

impl Default for MemoryPartStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PartBlobClient for MemoryPartStore {
    async fn put(&self, name: &str, bytes: Bytes) -> RelayResult<String> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let url = format!("memory://parts/{id}/{name}");
        self.parts.write().insert(url.clone(), bytes);
        Ok(url)
    }

    async fn get_range(&self, url: &str, start: u64, end: u64) -> RelayResult<ByteStream> {
        let part = self
            .part(url)
            .ok_or_else(|| RelayError::upstream_response(format!("no part at {url}"), 404, None))?;

        if start > end || end >= part.len() as u64 {
            return Err(RelayError::upstream_response(
                format!("range {start}-{end} outside part of {} bytes", part.len()),
                416,
                None,
            ));
        }

        let slice = part.slice(start as usize..=end as usize);
        let fragment_size = self.fragment_size;
        let stream = async_stream::stream! {
            let mut offset = 0;
            while offset < slice.len() {
                let next = (offset + fragment_size).min(slice.len());
                yield Ok::<_, std::io::Error>(slice.slice(offset..next));
                offset = next;
            }
        };
        Ok(Box::pin(stream))
    }
}

/// Manifest store backed by a vector in insertion order
#[derive(Clone, Default)]
pub struct MemoryManifestStore {
    manifests: Arc<RwLock<Vec<FileManifest>>>,
}

impl MemoryManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.manifests.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifests.read().is_empty()
    }
}

#[async_trait]
impl ManifestStore for MemoryManifestStore {
    async fn save(&self, manifest: &FileManifest) -> RelayResult<()> {
        let mut manifests = self.manifests.write();
        if manifests.iter().any(|m| m.file_id == manifest.file_id) {
            return Err(RelayError::persist(format!(
                "manifest {} already exists",
                manifest.file_id
            )));
        }
        manifests.push(manifest.clone());
        Ok(())
    }

    async fn find_one(&self, file_id: &str) -> RelayResult<Option<FileManifest>> {
        Ok(self
            .manifests
            .read()
            .iter()
            .find(|m| m.file_id == file_id)
            .cloned())
    }

    async fn find(
        &self,
        filter: &ManifestFilter,
        limit: u64,
        skip: u64,
    ) -> RelayResult<(Vec<FileManifest>, u64)> {
        let matching = self
            .manifests
            .read()
            .iter()
            .filter(|m| filter.matches(m))
            .cloned()
            .collect();
        Ok(paginate(matching, limit, skip))
    }
}
