use bytes::Bytes;
use futures_core::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use uuid::Uuid;

use crate::RelayResult;

/// Stream of bytes for file content, as delivered by a transport
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, std::io::Error>> + Send>>;

/// Stream of fixed-size chunks cut from a [`ByteStream`]
pub type ChunkStream = Pin<Box<dyn Stream<Item = RelayResult<Bytes>> + Send>>;

/// Unique identifier for a stored file
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub String);

impl FileId {
    /// Generate a new random file ID
    pub fn new() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Create from existing string
    pub fn from_string(id: String) -> Self {
        Self(id)
    }

    /// Get the inner string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for FileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Byte range requested by a client (inclusive bounds)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: Option<u64>, // None means "to end of file", bounded by the range window
}

impl ByteRange {
    pub fn new(start: u64, end: Option<u64>) -> Self {
        Self { start, end }
    }

    pub fn from_start(start: u64) -> Self {
        Self { start, end: None }
    }

    /// Parse a single `Range` header value of the form `bytes=<start>-[<end>]`.
    ///
    /// Returns `None` for anything else (suffix ranges, multiple ranges,
    /// other units, garbage); callers treat that as "no range requested".
    pub fn parse_header(value: &str) -> Option<Self> {
        let set = value.trim().strip_prefix("bytes=")?;
        if set.contains(',') {
            return None;
        }

        let (start, end) = set.split_once('-')?;
        let start = start.trim();
        if start.is_empty() {
            return None;
        }
        let start = start.parse::<u64>().ok()?;

        let end = end.trim();
        let end = if end.is_empty() {
            None
        } else {
            Some(end.parse::<u64>().ok()?)
        };

        Some(Self { start, end })
    }
}

/// Normalize a client supplied file name so it is safe inside part names and URL paths.
///
/// Path separators and control or reserved characters become `_`, whitespace
/// runs collapse to a single `_`. Returns `None` when nothing usable is left.
pub fn sanitize_file_name(raw: &str) -> Option<String> {
    let name = raw.trim().rsplit(['/', '\\']).next().unwrap_or_default();

    let mut out = String::with_capacity(name.len());
    let mut last_was_sep = false;
    for ch in name.chars() {
        let mapped = if ch.is_alphanumeric() || matches!(ch, '.' | '-' | '_' | '(' | ')') {
            ch
        } else {
            '_'
        };
        if mapped == '_' {
            if last_was_sep {
                continue;
            }
            last_was_sep = true;
        } else {
            last_was_sep = false;
        }
        out.push(mapped);
    }

    let out = out.trim_matches('_').to_string();
    if out.is_empty() || out.chars().all(|c| c == '.') {
        None
    } else {
        Some(out)
    }
}
