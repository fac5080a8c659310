use crate::error::{Error, Result};

/// Format tag of an LZ4-compressed frame. This is the tag a stream expects
/// unless configured otherwise.
pub const FORMAT_TAG_LZ4: u8 = 0x82;

/// Format tag of a frame whose payload is stored uncompressed.
pub const FORMAT_TAG_NONE: u8 = 0x02;

/// Format tag of a Zstd-compressed frame.
pub const FORMAT_TAG_ZSTD: u8 = 0x90;

/// Size of the checksum field that opens every frame, in bytes.
pub const CHECKSUM_SIZE: usize = 16;

/// Bytes counted by `frame_size` ahead of the compressed payload.
///   format_tag:u8 + frame_size:i32 + raw_size:i32 = 1 + 4 + 4 = 9
pub const SIZE_FIELDS_LEN: usize = 9;

/// Fixed on-wire size of a frame header.
///   checksum[16] + format_tag:u8 + frame_size:i32 + raw_size:i32 = 25
pub const FRAME_HEADER_SIZE: usize = CHECKSUM_SIZE + SIZE_FIELDS_LEN;

// ── Header ─────────────────────────────────────────────────────────────────

/// Decoded representation of the 25-byte frame header.
///
/// ```text
/// offset  size  field
///      0    16  checksum     digest of bytes [16 .. 16 + frame_size)
///     16     1  format_tag
///     17     4  frame_size   i32 LE, counts tag + both size fields + payload
///     21     4  raw_size     i32 LE, decompressed payload length
///     25     *  payload      frame_size - 9 bytes
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    /// Opaque wire encoding of the payload digest.
    pub checksum: [u8; CHECKSUM_SIZE],
    pub format_tag: u8,
    pub frame_size: i32,
    pub raw_size: i32,
}

impl FrameHeader {
    /// Length of the compressed payload that follows the header.
    ///
    /// Fails with [`Error::InvalidFrameSize`] when `frame_size` is smaller
    /// than the size fields it is supposed to include.
    pub fn compressed_len(&self) -> Result<usize> {
        let len = i64::from(self.frame_size) - SIZE_FIELDS_LEN as i64;
        usize::try_from(len).map_err(|_| Error::InvalidFrameSize {
            frame_size: self.frame_size,
        })
    }

    /// Length of the decompressed payload.
    pub fn raw_len(&self) -> Result<usize> {
        usize::try_from(self.raw_size).map_err(|_| Error::InvalidRawSize {
            raw_size: self.raw_size,
        })
    }

    /// The nine header bytes covered by the checksum, in wire order.
    pub fn covered_prefix(&self) -> [u8; SIZE_FIELDS_LEN] {
        let mut buf = [0u8; SIZE_FIELDS_LEN];
        buf[0] = self.format_tag;
        buf[1..5].copy_from_slice(&self.frame_size.to_le_bytes());
        buf[5..9].copy_from_slice(&self.raw_size.to_le_bytes());
        buf
    }

    /// Serialize to exactly `FRAME_HEADER_SIZE` bytes.
    pub fn to_bytes(&self) -> [u8; FRAME_HEADER_SIZE] {
        let mut buf = [0u8; FRAME_HEADER_SIZE];
        buf[..CHECKSUM_SIZE].copy_from_slice(&self.checksum);
        buf[CHECKSUM_SIZE..].copy_from_slice(&self.covered_prefix());
        buf
    }
}
