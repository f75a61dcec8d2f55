//! Mapping a global byte range onto part-local sub-ranges.
//!
//! All parts but the last are `chunk_size` long, so byte `b` of the file
//! lives in part `b / chunk_size` at offset `b % chunk_size`. A request
//! `[start, end]` therefore covers the half-open part span
//! `[start / chunk_size, (end + 1).div_ceil(chunk_size))`; the first part is
//! entered at `start % chunk_size` and the last one left at `end % chunk_size`.

use serde::{Deserialize, Serialize};

use crate::{ByteRange, FileManifest, RelayError, RelayResult};

/// Inclusive byte range inside a single part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartSlice {
    pub part_index: usize,
    pub local_start: u64,
    pub local_end: u64,
}

impl PartSlice {
    pub fn new(part_index: usize, local_start: u64, local_end: u64) -> Self {
        Self {
            part_index,
            local_start,
            local_end,
        }
    }

    pub fn len(&self) -> u64 {
        if self.is_empty() {
            return 0;
        }
        self.local_end - self.local_start + 1
    }

    pub fn is_empty(&self) -> bool {
        self.local_end < self.local_start
    }
}

/// Outcome of resolving a request against a manifest
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedRange {
    /// First global byte served
    pub start: u64,
    /// Last global byte served (meaningless when `slices` is empty)
    pub end: u64,
    pub total_size: u64,
    /// True when the client asked for a range (206 semantics)
    pub partial: bool,
    pub slices: Vec<PartSlice>,
}

impl ResolvedRange {
    pub fn content_length(&self) -> u64 {
        self.slices.iter().map(PartSlice::len).sum()
    }

    /// `Content-Range` value for partial responses
    pub fn content_range(&self) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, self.total_size)
    }
}

/// Resolves requested ranges for one manifest
#[derive(Debug, Clone, Copy)]
pub struct RangeResolver<'a> {
    manifest: &'a FileManifest,
    window: u64,
}

impl<'a> RangeResolver<'a> {
    /// `window` bounds open-ended requests (`bytes=<start>-`)
    pub fn new(manifest: &'a FileManifest, window: u64) -> Self {
        Self {
            manifest,
            window: window.max(1),
        }
    }

    pub fn resolve(&self, requested: Option<ByteRange>) -> RelayResult<ResolvedRange> {
        let file_size = self.manifest.file_size;

        let Some(range) = requested else {
            if file_size == 0 {
                return Ok(ResolvedRange {
                    start: 0,
                    end: 0,
                    total_size: 0,
                    partial: false,
                    slices: Vec::new(),
                });
            }
            return Ok(ResolvedRange {
                start: 0,
                end: file_size - 1,
                total_size: file_size,
                partial: false,
                slices: self.slices(0, file_size - 1)?,
            });
        };

        let start = range.start;
        if start >= file_size {
            return Err(RelayError::RangeNotSatisfiable { file_size });
        }
        let last_byte = file_size - 1;
        let end = match range.end {
            Some(end) => end.min(last_byte),
            None => start.saturating_add(self.window - 1).min(last_byte),
        };
        if end < start {
            return Err(RelayError::RangeNotSatisfiable { file_size });
        }

        Ok(ResolvedRange {
            start,
            end,
            total_size: file_size,
            partial: true,
            slices: self.slices(start, end)?,
        })
    }

    fn slices(&self, start: u64, end: u64) -> RelayResult<Vec<PartSlice>> {
        let chunk_size = self.manifest.chunk_size;
        let start_part = (start / chunk_size) as usize;
        let end_part_exclusive = (end + 1).div_ceil(chunk_size) as usize;

        if end_part_exclusive > self.manifest.parts.len() {
            return Err(RelayError::corrupt(
                &self.manifest.file_id,
                format!(
                    "byte {end} needs part {end_part_exclusive} but only {} exist",
                    self.manifest.parts.len()
                ),
            ));
        }

        let last = end_part_exclusive - 1;
        let mut slices = Vec::with_capacity(end_part_exclusive - start_part);
        for index in start_part..end_part_exclusive {
            let part_len = self.manifest.part_len(index).unwrap_or(chunk_size);
            let local_start = if index == start_part { start % chunk_size } else { 0 };
            let local_end = if index == last { end % chunk_size } else { part_len - 1 };
            slices.push(PartSlice::new(index, local_start, local_end));
        }
        Ok(slices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileId;

    fn manifest(chunk_size: u64, file_size: u64) -> FileManifest {
        let parts = FileManifest::expected_parts(file_size, chunk_size) as usize;
        FileManifest::new(
            FileId::from_string("f".into()),
            "f.bin",
            chunk_size,
            file_size,
            (0..parts).map(|i| format!("memory://parts/{i}")).collect(),
        )
        .unwrap()
    }

    #[test]
    fn slices_are_inclusive() {
        let one = PartSlice::new(3, 7, 7);
        assert_eq!(one.len(), 1);
        assert!(!one.is_empty());

        let inverted = PartSlice::new(3, 8, 7);
        assert_eq!(inverted.len(), 0);
        assert!(inverted.is_empty());
    }

    #[test]
    fn range_inside_one_part() {
        let m = manifest(1000, 2000);
        let r = RangeResolver::new(&m, 5000)
            .resolve(Some(ByteRange::new(100, Some(200))))
            .unwrap();
        assert_eq!(r.slices, vec![PartSlice::new(0, 100, 200)]);
        assert_eq!(r.content_length(), 101);
        assert_eq!(r.content_range(), "bytes 100-200/2000");
        assert!(r.partial);
    }

    #[test]
    fn range_crossing_a_part_boundary() {
        let m = manifest(1000, 2000);
        let r = RangeResolver::new(&m, 5000)
            .resolve(Some(ByteRange::new(950, Some(1050))))
            .unwrap();
        assert_eq!(r.slices, vec![PartSlice::new(0, 950, 999), PartSlice::new(1, 0, 50)]);
        assert_eq!(r.content_length(), 101);
    }

    #[test]
    fn start_zero_resolves_part_zero() {
        let m = manifest(1000, 2500);
        let r = RangeResolver::new(&m, 10).resolve(Some(ByteRange::from_start(0))).unwrap();
        assert_eq!(r.slices, vec![PartSlice::new(0, 0, 9)]);
        assert_eq!((r.start, r.end), (0, 9));
    }

    #[test]
    fn open_ended_request_near_eof_is_clamped() {
        let m = manifest(1000, 2500);
        let r = RangeResolver::new(&m, 5000)
            .resolve(Some(ByteRange::from_start(2400)))
            .unwrap();
        assert_eq!(r.end, 2499);
        assert_eq!(r.slices, vec![PartSlice::new(2, 400, 499)]);
        assert!(r.slices.iter().all(|s| s.part_index < m.parts.len()));
    }

    #[test]
    fn open_ended_request_is_bounded_by_window() {
        let m = manifest(1000, 10_000);
        let r = RangeResolver::new(&m, 1500)
            .resolve(Some(ByteRange::from_start(500)))
            .unwrap();
        assert_eq!((r.start, r.end), (500, 1999));
        assert_eq!(r.slices, vec![PartSlice::new(0, 500, 999), PartSlice::new(1, 0, 999)]);
        assert_eq!(r.content_length(), 1500);
    }

    #[test]
    fn end_on_a_part_boundary_includes_the_next_part() {
        let m = manifest(1000, 3000);
        let r = RangeResolver::new(&m, 5000)
            .resolve(Some(ByteRange::new(1000, Some(2000))))
            .unwrap();
        assert_eq!(r.slices, vec![PartSlice::new(1, 0, 999), PartSlice::new(2, 0, 0)]);
        assert_eq!(r.content_length(), 1001);
    }

    #[test]
    fn explicit_end_past_eof_is_clamped() {
        let m = manifest(1000, 1500);
        let r = RangeResolver::new(&m, 10)
            .resolve(Some(ByteRange::new(10, Some(99_999))))
            .unwrap();
        assert_eq!(r.end, 1499);
        assert_eq!(r.slices, vec![PartSlice::new(0, 10, 999), PartSlice::new(1, 0, 499)]);
    }

    #[test]
    fn whole_file_without_range() {
        let m = manifest(1000, 2017);
        let r = RangeResolver::new(&m, 10).resolve(None).unwrap();
        assert!(!r.partial);
        assert_eq!(
            r.slices,
            vec![PartSlice::new(0, 0, 999), PartSlice::new(1, 0, 999), PartSlice::new(2, 0, 16)]
        );
        assert_eq!(r.content_length(), 2017);
    }

    #[test]
    fn empty_file_has_no_slices() {
        let m = manifest(1000, 0);
        let r = RangeResolver::new(&m, 10).resolve(None).unwrap();
        assert!(r.slices.is_empty());
        assert_eq!(r.content_length(), 0);
    }

    #[test]
    fn degenerate_windows_are_caller_errors() {
        let m = manifest(1000, 1500);
        let resolver = RangeResolver::new(&m, 10);
        for range in [
            ByteRange::from_start(1500),
            ByteRange::from_start(9000),
            ByteRange::new(700, Some(600)),
        ] {
            assert!(matches!(
                resolver.resolve(Some(range)),
                Err(RelayError::RangeNotSatisfiable { file_size: 1500 })
            ));
        }

        let empty = manifest(1000, 0);
        assert!(matches!(
            RangeResolver::new(&empty, 10).resolve(Some(ByteRange::from_start(0))),
            Err(RelayError::RangeNotSatisfiable { file_size: 0 })
        ));
    }
}
