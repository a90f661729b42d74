//! Delta records: binary framing and reconstruction
//!
//! Layout (integers little-endian):
//! ```text
//! parent        32 bytes   hash of the object this record is based on
//! segment_count u64
//! segment*:
//!   0x00 Copy    offset u64, len u64
//!   0x01 Literal raw_len u64, payload_len u64, payload
//! ```
//!
//! Every payload is length-prefixed, so payloads may contain any byte value.

use crate::error::DeltaError;
use crate::model::Hash;
use serde::Serialize;
use std::io::Read;

const TAG_COPY: u8 = 0x00;
const TAG_LITERAL: u8 = 0x01;

/// One step of reconstructing a revision
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Segment {
    /// `base[offset..offset + len]`
    Copy { offset: u64, len: u64 },
    /// zstd-compressed bytes that expand to `raw_len` bytes
    Literal { raw_len: u64, payload: Vec<u8> },
}

impl Segment {
    /// Number of bytes this segment contributes to the output
    pub fn output_len(&self) -> u64 {
        match self {
            Segment::Copy { len, .. } => *len,
            Segment::Literal { raw_len, .. } => *raw_len,
        }
    }
}

/// Size breakdown of a delta record
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct DeltaStats {
    pub copy_segments: usize,
    pub literal_segments: usize,
    pub copied_bytes: u64,
    pub literal_bytes: u64,
    pub compressed_bytes: u64,
}

/// Ordered segments describing a revision relative to its parent object
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeltaRecord {
    pub parent: Hash,
    pub segments: Vec<Segment>,
}

impl DeltaRecord {
    pub fn new(parent: Hash) -> Self {
        DeltaRecord {
            parent,
            segments: Vec::new(),
        }
    }

    /// Length of the revision this record reconstructs
    pub fn output_len(&self) -> u64 {
        self.segments.iter().map(Segment::output_len).sum()
    }

    pub fn stats(&self) -> DeltaStats {
        let mut stats = DeltaStats::default();
        for segment in &self.segments {
            match segment {
                Segment::Copy { len, .. } => {
                    stats.copy_segments += 1;
                    stats.copied_bytes += len;
                }
                Segment::Literal { raw_len, payload } => {
                    stats.literal_segments += 1;
                    stats.literal_bytes += raw_len;
                    stats.compressed_bytes += payload.len() as u64;
                }
            }
        }
        stats
    }

    /// Serialize to the payload of a delta object
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Hash::LEN + 8 + self.segments.len() * 17);
        out.extend_from_slice(self.parent.as_bytes());
        out.extend_from_slice(&(self.segments.len() as u64).to_le_bytes());

        for segment in &self.segments {
            match segment {
                Segment::Copy { offset, len } => {
                    out.push(TAG_COPY);
                    out.extend_from_slice(&offset.to_le_bytes());
                    out.extend_from_slice(&len.to_le_bytes());
                }
                Segment::Literal { raw_len, payload } => {
                    out.push(TAG_LITERAL);
                    out.extend_from_slice(&raw_len.to_le_bytes());
                    out.extend_from_slice(&(payload.len() as u64).to_le_bytes());
                    out.extend_from_slice(payload);
                }
            }
        }
        out
    }

    /// Parse a delta object payload
    pub fn decode(data: &[u8]) -> Result<Self, DeltaError> {
        let mut reader = Reader::new(data);

        let parent = Hash::from_bytes(reader.array("parent")?);
        let count = reader.u64("segment count")?;

        let mut segments = Vec::new();
        for _ in 0..count {
            let segment = match reader.u8("segment tag")? {
                TAG_COPY => Segment::Copy {
                    offset: reader.u64("copy offset")?,
                    len: reader.u64("copy length")?,
                },
                TAG_LITERAL => {
                    let raw_len = reader.u64("literal length")?;
                    let payload_len = reader.u64("payload length")?;
                    let payload_len = usize::try_from(payload_len)
                        .map_err(|_| DeltaError::Truncated("literal payload"))?;
                    Segment::Literal {
                        raw_len,
                        payload: reader.take(payload_len, "literal payload")?.to_vec(),
                    }
                }
                other => return Err(DeltaError::UnknownSegment(other)),
            };
            segments.push(segment);
        }

        if reader.remaining() > 0 {
            return Err(DeltaError::TrailingBytes(reader.remaining()));
        }

        Ok(DeltaRecord { parent, segments })
    }

    /// Rebuild the revision from the parent's reconstructed content
    pub fn apply(&self, base: &[u8]) -> Result<Vec<u8>, DeltaError> {
        let mut output = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Copy { offset, len } => {
                    let range = copy_range(*offset, *len, base.len()).ok_or(
                        DeltaError::CopyOutOfRange {
                            offset: *offset,
                            len: *len,
                            base_len: base.len(),
                        },
                    )?;
                    output.extend_from_slice(&base[range]);
                }
                Segment::Literal { raw_len, payload } => {
                    let expanded = decompress(payload, *raw_len)?;
                    output.extend_from_slice(&expanded);
                }
            }
        }

        Ok(output)
    }
}

fn copy_range(offset: u64, len: u64, base_len: usize) -> Option<std::ops::Range<usize>> {
    let start = usize::try_from(offset).ok()?;
    let end = start.checked_add(usize::try_from(len).ok()?)?;
    (end <= base_len).then_some(start..end)
}

/// Expand a literal payload, checking it yields exactly `raw_len` bytes
///
/// Reads at most one byte past `raw_len` so a bogus length cannot make
/// us buffer an unbounded amount of output.
fn decompress(payload: &[u8], raw_len: u64) -> Result<Vec<u8>, DeltaError> {
    let decoder = zstd::stream::Decoder::with_buffer(payload).map_err(DeltaError::Decompression)?;

    let mut expanded = Vec::new();
    decoder
        .take(raw_len.saturating_add(1))
        .read_to_end(&mut expanded)
        .map_err(DeltaError::Decompression)?;

    let found = expanded.len() as u64;
    if found != raw_len {
        return Err(DeltaError::LengthMismatch {
            expected: raw_len,
            found,
        });
    }
    Ok(expanded)
}

/// Bounds-checked cursor over record bytes
struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Reader { buf, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    fn take(&mut self, n: usize, what: &'static str) -> Result<&'a [u8], DeltaError> {
        if n > self.remaining() {
            return Err(DeltaError::Truncated(what));
        }
        let bytes = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    fn array<const N: usize>(&mut self, what: &'static str) -> Result<[u8; N], DeltaError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, DeltaError> {
        Ok(self.take(1, what)?[0])
    }

    fn u64(&mut self, what: &'static str) -> Result<u64, DeltaError> {
        Ok(u64::from_le_bytes(self.array(what)?))
    }
}
