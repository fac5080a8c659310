use blockstream_core::checksum::{Digest, FrameChecksum};

/// CityHash v1.0.2, 128-bit variant: the checksum ClickHouse writes in front
/// of every compressed block.
///
/// ClickHouse stores the two 64-bit halves low-half first, so the digest is
/// rotated by 64 bits to line up with a little-endian read of the wire
/// field.
#[derive(Debug, Default, Clone, Copy)]
pub struct CityHash128;

impl FrameChecksum for CityHash128 {
    fn name(&self) -> &'static str {
        "cityhash128"
    }

    fn compute(&self, covered: &[u8]) -> Digest {
        let hash = cityhash_rs::cityhash_102_128(covered);
        Digest(hash.rotate_left(64))
    }
}
