use bytes::Bytes;
use futures_util::StreamExt;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::{ChunkStream, PartBlobClient, RelayError, RelayResult};

/// Deterministic name of the 1-based `index`th part of `file_name`
pub fn part_name(file_name: &str, index: usize) -> String {
    format!("{file_name}-chunk-{index}")
}

/// Ordered part URLs of a finished upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedParts {
    pub parts: Vec<String>,
    pub file_size: u64,
}

/// Uploads chunks one at a time, in order.
///
/// Chunk production and upload run concurrently, joined by a bounded queue
/// of `queue_depth` chunks. When the queue is full the producer stops pulling
/// from the chunk stream, which in turn stops reading the request body.
pub struct PartUploader {
    client: Arc<dyn PartBlobClient>,
    file_name: String,
    queue_depth: usize,
    max_file_bytes: u64,
}

impl PartUploader {
    pub fn new(client: Arc<dyn PartBlobClient>, file_name: impl Into<String>) -> Self {
        Self {
            client,
            file_name: file_name.into(),
            queue_depth: 2,
            max_file_bytes: u64::MAX,
        }
    }

    pub fn with_queue_depth(mut self, depth: usize) -> Self {
        self.queue_depth = depth.max(1);
        self
    }

    pub fn with_max_file_bytes(mut self, bytes: u64) -> Self {
        self.max_file_bytes = bytes;
        self
    }

    /// Drain `chunks`, uploading each as `<file_name>-chunk-<n>`.
    ///
    /// On failure the parts uploaded so far stay on the remote host; nothing
    /// references them.
    pub async fn upload(&self, mut chunks: ChunkStream) -> RelayResult<UploadedParts> {
        let (tx, mut rx) = mpsc::channel::<Bytes>(self.queue_depth);
        let max_file_bytes = self.max_file_bytes;

        let produce = async move {
            let mut received: u64 = 0;
            while let Some(chunk) = chunks.next().await {
                let chunk = chunk?;
                received += chunk.len() as u64;
                if received > max_file_bytes {
                    return Err(RelayError::invalid(format!(
                        "file exceeds maximum size of {max_file_bytes} bytes"
                    )));
                }
                if tx.send(chunk).await.is_err() {
                    // The consumer failed and dropped its receiver; its error wins.
                    break;
                }
            }
            Ok::<_, RelayError>(())
        };

        let consume = async {
            let mut parts = Vec::new();
            let mut file_size: u64 = 0;
            while let Some(chunk) = rx.recv().await {
                let name = part_name(&self.file_name, parts.len() + 1);
                let len = chunk.len() as u64;
                match self.client.put(&name, chunk).await {
                    Ok(url) => {
                        debug!(part = %name, bytes = len, "part uploaded");
                        parts.push(url);
                        file_size += len;
                    }
                    Err(e) => {
                        warn!(
                            part = %name,
                            orphaned_parts = parts.len(),
                            error = %e,
                            "part upload failed"
                        );
                        return Err(e);
                    }
                }
            }
            Ok::<_, RelayError>(UploadedParts { parts, file_size })
        };

        let ((), uploaded) = tokio::try_join!(produce, consume)?;
        Ok(uploaded)
    }
}
