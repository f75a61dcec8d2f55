//! # relay-blob: chunked file relay over remote part hosts
//!
//! `relay-blob` stores arbitrarily large files on hosts that only accept
//! small objects. An upload is cut into fixed-size parts while it streams in,
//! each part is pushed to a [`PartBlobClient`], and the ordered part URLs are
//! recorded in a [`FileManifest`]. Reads map a byte range onto part-local
//! sub-ranges and stream them back in order.
//!
//! ## Key Features
//!
//! - **Streaming both ways**: neither uploads nor downloads hold a whole file
//!   in memory; bounded queues carry backpressure from the slow side
//! - **Deterministic chunking**: part boundaries depend on byte offsets only
//! - **Range requests**: open-ended and bounded `bytes=` ranges across parts
//! - **Pluggable collaborators**: HTTP and S3-compatible part hosts, memory
//!   and filesystem manifest stores, or your own implementations
//!
//! ## Quick Start
//!
//! ```rust
//! use relay_blob::prelude::*;
//! use bytes::Bytes;
//!
//! # #[tokio::main]
//! # async fn main() -> RelayResult<()> {
//! let relay = RelayAdapter::new(
//!     MemoryPartStore::new(),
//!     MemoryManifestStore::new(),
//!     RelayConfig::default(),
//! );
//!
//! let body: ByteStream = Box::pin(futures_util::stream::iter(vec![Ok(Bytes::from_static(
//!     b"Hello, world!",
//! ))]));
//! let manifest = relay.put("hello.txt", body).await?;
//!
//! let opened = relay.open(&manifest.file_id, Some(ByteRange::new(0, Some(4)))).await?;
//! assert_eq!(opened.content_length(), 5);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐
//! │  transport (HTTP, CLI, ...)  │
//! ├──────────────────────────────┤
//! │         RelayAdapter         │  ← chunking, manifests, ranges
//! ├───────────────┬──────────────┤
//! │PartBlobClient │ManifestStore │  ← storage primitives
//! └───────────────┴──────────────┘
//! ```

pub mod adapter;
mod chunker;
mod config;
mod error;
mod fs_store;
mod http_client;
mod listing;
mod manifest;
mod memory;
mod range;
mod reassembler;
mod receipt;
mod s3_client;
pub mod store;
mod types;
mod upload;

// Re-export main types for clean API
pub use adapter::RelayAdapter;
pub use chunker::{chunk_stream, StreamChunker};
pub use config::{ChunkRules, RelayConfig};
pub use error::{RelayError, RelayResult};
pub use fs_store::FsManifestStore;
pub use http_client::{HttpPartClient, HttpPartConfig};
pub use listing::{ListQuery, ManifestPage, DEFAULT_PAGE_LIMIT};
pub use manifest::FileManifest;
pub use memory::{MemoryManifestStore, MemoryPartStore};
pub use range::{PartSlice, RangeResolver, ResolvedRange};
pub use reassembler::{BodySender, RangeReassembler};
pub use receipt::{OpenedFile, UploadReceipt};
pub use s3_client::{S3PartClient, S3PartConfig};
pub use store::{ManifestFilter, ManifestStore, PartBlobClient};
pub use types::{sanitize_file_name, ByteRange, ByteStream, ChunkStream, FileId};
pub use upload::{part_name, PartUploader, UploadedParts};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::{
        ByteRange, ByteStream, FileManifest, ManifestStore, MemoryManifestStore, MemoryPartStore,
        PartBlobClient, RelayAdapter, RelayConfig, RelayError, RelayResult, UploadReceipt,
    };
}
