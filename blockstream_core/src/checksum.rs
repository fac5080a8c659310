use std::fmt;

use xxhash_rust::xxh3::xxh3_128;

use crate::format::CHECKSUM_SIZE;

/// A 128-bit frame digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Digest(pub u128);

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:032x}", self.0)
    }
}

/// Integrity check applied to every frame.
///
/// The digest covers the format tag, both size fields and the compressed
/// payload, exactly as they appear on the wire. It never covers the
/// decompressed content, so a frame is rejected before any decompression
/// work is spent on it.
///
/// `decode_wire` and `encode_wire` translate between a [`Digest`] and the
/// 16 checksum bytes that open a frame. The default implementations read
/// and write the value as a little-endian `u128`.
pub trait FrameChecksum: Send + Sync {
    /// Human-readable algorithm name for CLI display and logs.
    fn name(&self) -> &'static str;

    /// Digest of `covered`: the bytes `[format_tag, frame_size, raw_size,
    /// compressed payload]` of one frame.
    fn compute(&self, covered: &[u8]) -> Digest;

    fn decode_wire(&self, wire: &[u8; CHECKSUM_SIZE]) -> Digest {
        Digest(u128::from_le_bytes(*wire))
    }

    fn encode_wire(&self, digest: Digest) -> [u8; CHECKSUM_SIZE] {
        digest.0.to_le_bytes()
    }
}

/// XXH3-128 frame checksum.
///
/// Not what ClickHouse writes (see `blockstream_codecs::CityHash128`), but a
/// fast, well-distributed default for streams produced by other writers.
#[derive(Debug, Default, Clone, Copy)]
pub struct Xxh3Checksum;

impl FrameChecksum for Xxh3Checksum {
    fn name(&self) -> &'static str {
        "xxh3-128"
    }

    fn compute(&self, covered: &[u8]) -> Digest {
        Digest(xxh3_128(covered))
    }
}
