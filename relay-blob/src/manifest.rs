//! Persisted description of a chunked file.
//!
//! A [`FileManifest`] is the only record tying a file id to the ordered part
//! URLs on the remote host. The order of `parts` is the byte order of the
//! file; nothing else encodes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{FileId, RelayError, RelayResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileManifest {
    pub file_id: String,
    pub chunk_size: u64,
    pub file_name: String,
    pub file_size: u64,
    pub parts: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl FileManifest {
    /// Build a manifest for a completed upload, checking the size invariant.
    pub fn new(
        file_id: FileId,
        file_name: impl Into<String>,
        chunk_size: u64,
        file_size: u64,
        parts: Vec<String>,
    ) -> RelayResult<Self> {
        let manifest = Self {
            file_id: file_id.0,
            chunk_size,
            file_name: file_name.into(),
            file_size,
            parts,
            created_at: Utc::now(),
        };
        manifest.validate()?;
        Ok(manifest)
    }

    /// Number of parts a file of `file_size` bytes occupies.
    pub fn expected_parts(file_size: u64, chunk_size: u64) -> u64 {
        file_size.div_ceil(chunk_size)
    }

    /// Check `parts.len() == ceil(file_size / chunk_size)`.
    ///
    /// Run before saving and again after every load; a stored document that
    /// fails it is never streamed.
    pub fn validate(&self) -> RelayResult<()> {
        if self.chunk_size == 0 {
            return Err(RelayError::corrupt(&self.file_id, "chunk_size is zero"));
        }
        let expected = Self::expected_parts(self.file_size, self.chunk_size);
        if self.parts.len() as u64 != expected {
            return Err(RelayError::corrupt(
                &self.file_id,
                format!(
                    "{} parts recorded but {} bytes at chunk size {} need {}",
                    self.parts.len(),
                    self.file_size,
                    self.chunk_size,
                    expected
                ),
            ));
        }
        Ok(())
    }

    /// Byte length of part `index`, or `None` past the end.
    pub fn part_len(&self, index: usize) -> Option<u64> {
        let count = self.parts.len();
        if index >= count {
            return None;
        }
        if index + 1 < count {
            Some(self.chunk_size)
        } else {
            Some(self.file_size - self.chunk_size * (count as u64 - 1))
        }
    }
}
