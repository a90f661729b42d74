//! Chunk-matching delta encoder

use super::{DeltaRecord, Segment};
use crate::model::{Config, Hash};
use crate::Result;
use std::io::Write;

/// Splits a new revision into fixed-size chunks and describes each one
/// either as a copy out of the old revision or as a compressed literal.
///
/// Only whole chunks are matched, at their first occurrence in the old
/// content. An edit anywhere inside a chunk turns that chunk into a literal.
#[derive(Clone, Copy, Debug)]
pub struct DeltaEncoder {
    chunk_size: usize,
    level: i32,
}

impl DeltaEncoder {
    /// `chunk_size` is clamped to at least one byte
    pub fn new(chunk_size: usize, level: i32) -> Self {
        DeltaEncoder {
            chunk_size: chunk_size.max(1),
            level,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.chunk_size, config.compression_level)
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Describe `new` relative to `old`, whose object hash is `parent`
    pub fn encode(&self, parent: Hash, old: &[u8], new: &[u8]) -> Result<DeltaRecord> {
        let mut record = DeltaRecord::new(parent);

        for (index, chunk) in new.chunks(self.chunk_size).enumerate() {
            let segment = match find_chunk(old, chunk) {
                Some(offset) => Segment::Copy {
                    offset: offset as u64,
                    len: chunk.len() as u64,
                },
                None => Segment::Literal {
                    raw_len: chunk.len() as u64,
                    payload: compress(chunk, self.level)?,
                },
            };
            tracing::trace!(index, len = chunk.len(), segment = kind(&segment), "chunk");
            record.segments.push(segment);
        }

        Ok(record)
    }
}

fn kind(segment: &Segment) -> &'static str {
    match segment {
        Segment::Copy { .. } => "copy",
        Segment::Literal { .. } => "literal",
    }
}

/// Leftmost occurrence of `needle` in `haystack`
fn find_chunk(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || needle.len() > haystack.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

/// zstd with the frame checksum on, so damaged payloads fail to decode
fn compress(data: &[u8], level: i32) -> Result<Vec<u8>> {
    let mut encoder = zstd::stream::Encoder::new(Vec::new(), level)?;
    encoder.include_checksum(true)?;
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder(chunk_size: usize) -> DeltaEncoder {
        DeltaEncoder::new(chunk_size, 3)
    }

    #[test]
    fn test_find_chunk_leftmost() {
        assert_eq!(find_chunk(b"abcabc", b"bc"), Some(1));
        assert_eq!(find_chunk(b"abcabc", b"cab"), Some(2));
        assert_eq!(find_chunk(b"abc", b"abcd"), None);
        assert_eq!(find_chunk(b"", b"a"), None);
    }

    #[test]
    fn test_whole_revision_copied() {
        let old = b"Initial content of a large file.";
        let record = encoder(1024).encode(Hash::ZERO, old, old).unwrap();

        assert_eq!(record.segments, vec![Segment::Copy { offset: 0, len: 32 }]);
        assert_eq!(record.apply(old).unwrap(), old);
    }

    #[test]
    fn test_append_with_large_chunks_is_one_literal() {
        let old = b"Initial content of a large file.";
        let new = b"Initial content of a large file. Some changes here.";
        let record = encoder(1024 * 1024).encode(Hash::ZERO, old, new).unwrap();

        assert_eq!(record.segments.len(), 1);
        assert!(matches!(record.segments[0], Segment::Literal { raw_len: 51, .. }));
        assert_eq!(record.apply(old).unwrap(), new);
    }

    #[test]
    fn test_small_chunks_mix_copies_and_literals() {
        let old = b"aaaabbbbccccdddd";
        let new = b"ccccXXXXaaaadd";
        let record = encoder(4).encode(Hash::ZERO, old, new).unwrap();

        assert_eq!(
            record.segments[0],
            Segment::Copy { offset: 8, len: 4 }
        );
        assert!(matches!(record.segments[1], Segment::Literal { raw_len: 4, .. }));
        assert_eq!(record.segments[2], Segment::Copy { offset: 0, len: 4 });
        // Final short chunk "dd" still matches inside "dddd"
        assert_eq!(record.segments[3], Segment::Copy { offset: 12, len: 2 });
        assert_eq!(record.apply(old).unwrap(), new);
    }

    #[test]
    fn test_exact_multiple_has_no_empty_chunk() {
        let new = vec![7u8; 4096];
        let record = encoder(1024).encode(Hash::ZERO, b"", &new).unwrap();

        assert_eq!(record.segments.len(), 4);
        assert!(record.segments.iter().all(|s| s.output_len() == 1024));
        assert_eq!(record.apply(b"").unwrap(), new);
    }

    #[test]
    fn test_empty_new_content() {
        let record = encoder(16).encode(Hash::ZERO, b"old", b"").unwrap();
        assert!(record.segments.is_empty());
        assert!(record.apply(b"old").unwrap().is_empty());
    }

    #[test]
    fn test_zero_chunk_size_clamped() {
        assert_eq!(encoder(0).chunk_size(), 1);
    }

    #[test]
    fn test_binary_content() {
        let old: Vec<u8> = (0..=255u8).collect();
        let mut new = old.clone();
        new.extend((0..=255u8).rev());
        let record = encoder(64).encode(Hash::ZERO, &old, &new).unwrap();

        let decoded = DeltaRecord::decode(&record.encode()).unwrap();
        assert_eq!(decoded.apply(&old).unwrap(), new);
    }
}
