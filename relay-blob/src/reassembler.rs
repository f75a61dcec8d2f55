//! Streaming a resolved range out of its parts.
//!
//! Parts are fetched strictly one after another and every fragment is pushed
//! into a bounded channel before the next one is pulled, so at most
//! `buffer` fragments sit in memory no matter how large the range is.

use bytes::Bytes;
use futures_util::StreamExt;
use std::io;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

use crate::{ByteStream, FileManifest, PartBlobClient, PartSlice, RelayError, RelayResult, ResolvedRange};

/// Sink side of a reassembled body
pub type BodySender = mpsc::Sender<io::Result<Bytes>>;

pub struct RangeReassembler {
    client: Arc<dyn PartBlobClient>,
    file_id: String,
    targets: Vec<(String, PartSlice)>,
}

impl RangeReassembler {
    /// Pair every slice of `range` with the part URL it reads from.
    ///
    /// `range` must come from a [`crate::RangeResolver`] over the same
    /// manifest, which guarantees every slice index is in bounds.
    pub fn new(client: Arc<dyn PartBlobClient>, manifest: &FileManifest, range: &ResolvedRange) -> Self {
        let targets = range
            .slices
            .iter()
            .filter_map(|slice| {
                manifest
                    .parts
                    .get(slice.part_index)
                    .map(|url| (url.clone(), *slice))
            })
            .collect();
        Self {
            client,
            file_id: manifest.file_id.clone(),
            targets,
        }
    }

    /// Total bytes this reassembler will write
    pub fn content_length(&self) -> u64 {
        self.targets.iter().map(|(_, slice)| slice.len()).sum()
    }

    /// Write every slice into `sink`, in order. Returns the bytes written.
    ///
    /// Fails with [`RelayError::Disconnected`] once the receiving half is
    /// dropped, abandoning any fetch still in flight.
    pub async fn forward(self, sink: &BodySender) -> RelayResult<u64> {
        let mut written: u64 = 0;

        for (url, slice) in &self.targets {
            if sink.is_closed() {
                return Err(RelayError::Disconnected);
            }

            let mut fragments = tokio::select! {
                biased;
                _ = sink.closed() => return Err(RelayError::Disconnected),
                opened = self.client.get_range(url, slice.local_start, slice.local_end) => opened?,
            };

            let mut remaining = slice.len();
            while remaining > 0 {
                let next = tokio::select! {
                    biased;
                    _ = sink.closed() => return Err(RelayError::Disconnected),
                    next = fragments.next() => next,
                };
                let Some(fragment) = next else {
                    break;
                };
                let mut fragment = fragment.map_err(|e| {
                    RelayError::upstream(format!("reading part {}: {e}", slice.part_index))
                })?;

                // Hosts that ignore the range header send more than asked for.
                if fragment.len() as u64 > remaining {
                    fragment.truncate(remaining as usize);
                }
                if fragment.is_empty() {
                    continue;
                }
                remaining -= fragment.len() as u64;
                written += fragment.len() as u64;

                sink.send(Ok(fragment))
                    .await
                    .map_err(|_| RelayError::Disconnected)?;
            }

            if remaining > 0 {
                return Err(RelayError::upstream(format!(
                    "part {} of {} ended {} bytes early",
                    slice.part_index, self.file_id, remaining
                )));
            }
        }

        Ok(written)
    }

    /// Run [`forward`](Self::forward) on a background task and expose the
    /// channel as a body stream.
    ///
    /// A failure after the first byte cannot change the response status any
    /// more, so it is delivered as an `io::Error` item that aborts the body.
    pub fn into_body_stream(self, buffer: usize) -> ByteStream {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let file_id = self.file_id.clone();

        tokio::spawn(async move {
            match self.forward(&tx).await {
                Ok(bytes) => debug!(file_id = %file_id, bytes, "range delivered"),
                Err(RelayError::Disconnected) => {
                    debug!(file_id = %file_id, "consumer disconnected, stopped reading parts")
                }
                Err(e) => {
                    warn!(file_id = %file_id, error = %e, "reassembly aborted");
                    let _ = tx.send(Err(io::Error::other(e.to_string()))).await;
                }
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }
}
