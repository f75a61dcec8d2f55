//! Fixed-size chunking of an inbound byte stream.
//!
//! Transports hand us fragments of whatever size they like: one byte, a few
//! kilobytes, several megabytes. [`StreamChunker`] turns that into chunks of
//! exactly `chunk_size` bytes (the last one holds the residue), so the cut
//! points depend only on byte offsets and never on how the fragments arrived.

use bytes::{Bytes, BytesMut};
use futures_util::StreamExt;

use crate::{ByteStream, ChunkStream, RelayError};

/// Accumulates fragments and cuts fixed-size chunks off the front
#[derive(Debug)]
pub struct StreamChunker {
    chunk_size: usize,
    buf: BytesMut,
}

impl StreamChunker {
    /// `chunk_size` must be non-zero; [`crate::RelayConfig::validate`] guarantees it.
    pub fn new(chunk_size: usize) -> Self {
        assert!(chunk_size > 0, "chunk_size must be greater than zero");
        Self {
            chunk_size,
            buf: BytesMut::new(),
        }
    }

    /// Append a fragment. Call [`next_chunk`](Self::next_chunk) until it
    /// returns `None`: one fragment may complete several chunks.
    pub fn push(&mut self, fragment: &[u8]) {
        self.buf.extend_from_slice(fragment);
    }

    /// Cut the next complete chunk, if the buffer holds one
    pub fn next_chunk(&mut self) -> Option<Bytes> {
        if self.buf.len() >= self.chunk_size {
            Some(self.buf.split_to(self.chunk_size).freeze())
        } else {
            None
        }
    }

    /// Bytes waiting for a chunk to fill up
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// End of input: the residue becomes the final chunk unless it is empty
    pub fn finish(self) -> Option<Bytes> {
        if self.buf.is_empty() {
            None
        } else {
            Some(self.buf.freeze())
        }
    }
}

/// Lazily chunk `input`. Fragments are only pulled when the consumer asks
/// for the next chunk, so a slow consumer stops reading the source.
pub fn chunk_stream(mut input: ByteStream, chunk_size: usize) -> ChunkStream {
    let stream = async_stream::stream! {
        let mut chunker = StreamChunker::new(chunk_size);
        while let Some(fragment) = input.next().await {
            match fragment {
                Ok(fragment) => {
                    chunker.push(&fragment);
                    while let Some(chunk) = chunker.next_chunk() {
                        yield Ok::<_, RelayError>(chunk);
                    }
                }
                Err(e) => {
                    yield Err(RelayError::from(e));
                    return;
                }
            }
        }
        if let Some(rest) = chunker.finish() {
            yield Ok(rest);
        }
    };
    Box::pin(stream)
}
