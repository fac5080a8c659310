use std::io::{self, Read};
use std::ops::Deref;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::checksum::FrameChecksum;
use crate::codec::Decompressor;
use crate::config::DecoderConfig;
use crate::error::{Error, Result};
use crate::format::{FrameHeader, CHECKSUM_SIZE, SIZE_FIELDS_LEN};

/// The decompressed contents of one frame: exactly `raw_size` bytes,
/// immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBlock {
    data: Vec<u8>,
}

impl DecodedBlock {
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }
}

impl Deref for DecodedBlock {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

/// A validated frame header together with its decoded block.
#[derive(Debug, Clone)]
pub struct Frame {
    pub header: FrameHeader,
    pub block: DecodedBlock,
}

/// Parses frames off a byte source, verifies them, and decompresses them.
///
/// # Frame sequence
/// 1. Read the first checksum byte. An exhausted source here is a clean
///    end-of-stream; anywhere later it is [`Error::UnexpectedEndOfStream`].
/// 2. Read the rest of the checksum, then the format tag, and reject a tag
///    that differs from [`DecoderConfig::format_tag`].
/// 3. Read `frame_size` and `raw_size`, derive the payload length and check
///    both sizes against the configured limits.
/// 4. Read the payload, recompute the digest over `[tag, sizes, payload]`
///    and compare it to the header before trusting anything else.
/// 5. Decompress to exactly `raw_size` bytes.
pub struct BlockFramer {
    checksum: Arc<dyn FrameChecksum>,
    decompressor: Arc<dyn Decompressor>,
    config: DecoderConfig,
}

impl BlockFramer {
    pub fn new(
        checksum: Arc<dyn FrameChecksum>,
        decompressor: Arc<dyn Decompressor>,
        config: DecoderConfig,
    ) -> Self {
        Self {
            checksum,
            decompressor,
            config,
        }
    }

    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    pub fn checksum(&self) -> &Arc<dyn FrameChecksum> {
        &self.checksum
    }

    pub fn decompressor(&self) -> &Arc<dyn Decompressor> {
        &self.decompressor
    }

    /// Decode the next frame, or `None` at a clean end-of-stream.
    pub fn next_frame<R: Read + ?Sized>(&self, source: &mut R) -> Result<Option<DecodedBlock>> {
        Ok(self.next_frame_with_header(source)?.map(|frame| frame.block))
    }

    /// Like [`next_frame`](Self::next_frame), but also returns the parsed
    /// header for inspection.
    pub fn next_frame_with_header<R: Read + ?Sized>(
        &self,
        source: &mut R,
    ) -> Result<Option<Frame>> {
        let mut checksum = [0u8; CHECKSUM_SIZE];
        match read_byte(source)? {
            Some(first) => checksum[0] = first,
            None => {
                debug!("end of stream at frame boundary");
                return Ok(None);
            }
        }
        read_fully(source, &mut checksum[1..], "checksum")?;
        let expected = self.checksum.decode_wire(&checksum);

        // ── Tag and size fields ─────────────────────────────────────────────
        let mut tag = [0u8; 1];
        read_fully(source, &mut tag, "format tag")?;
        let format_tag = tag[0];
        if format_tag != self.config.format_tag {
            return Err(Error::InvalidFormatTag {
                found: format_tag,
                expected: self.config.format_tag,
            });
        }

        let mut sizes = [0u8; 8];
        read_fully(source, &mut sizes, "size fields")?;
        let header = FrameHeader {
            checksum,
            format_tag,
            frame_size: i32::from_le_bytes([sizes[0], sizes[1], sizes[2], sizes[3]]),
            raw_size: i32::from_le_bytes([sizes[4], sizes[5], sizes[6], sizes[7]]),
        };
        trace!(
            frame_size = header.frame_size,
            raw_size = header.raw_size,
            "parsed frame header"
        );

        let compressed_len = header.compressed_len()?;
        let raw_len = header.raw_len()?;
        check_limit("frame_size", compressed_len + SIZE_FIELDS_LEN, self.config.max_frame_size)?;
        check_limit("raw_size", raw_len, self.config.max_raw_size)?;

        // ── Payload ─────────────────────────────────────────────────────────
        // The covered bytes are kept contiguous so the digest sees exactly
        // what was on the wire.
        let mut covered = vec![0u8; SIZE_FIELDS_LEN + compressed_len];
        covered[..SIZE_FIELDS_LEN].copy_from_slice(&header.covered_prefix());
        read_fully(source, &mut covered[SIZE_FIELDS_LEN..], "payload")?;

        let actual = self.checksum.compute(&covered);
        if actual != expected {
            warn!(
                %expected,
                %actual,
                checksum = self.checksum.name(),
                "frame checksum mismatch"
            );
            return Err(Error::ChecksumMismatch { expected, actual });
        }

        // ── Decompress ──────────────────────────────────────────────────────
        let data = self
            .decompressor
            .decompress(&covered[SIZE_FIELDS_LEN..], raw_len)
            .map_err(|e| Error::DecompressionFailed {
                reason: format!("{} codec: {e:#}", self.decompressor.name()),
            })?;
        if data.len() != raw_len {
            return Err(Error::DecompressionFailed {
                reason: format!(
                    "{} codec produced {} bytes but the header says {}",
                    self.decompressor.name(),
                    data.len(),
                    raw_len
                ),
            });
        }

        debug!(compressed_len, raw_len, "decoded frame");
        Ok(Some(Frame {
            header,
            block: DecodedBlock { data },
        }))
    }
}

fn check_limit(field: &'static str, size: usize, limit: usize) -> Result<()> {
    if size > limit {
        return Err(Error::FrameTooLarge { field, size, limit });
    }
    Ok(())
}

/// Read one byte, or `None` if the source is exhausted.
fn read_byte<R: Read + ?Sized>(source: &mut R) -> Result<Option<u8>> {
    let mut byte = [0u8; 1];
    loop {
        match source.read(&mut byte) {
            Ok(0) => return Ok(None),
            Ok(_) => return Ok(Some(byte[0])),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}

/// Fill `buf` completely; running out of input is an error.
fn read_fully<R: Read + ?Sized>(source: &mut R, buf: &mut [u8], field: &'static str) -> Result<()> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(Error::UnexpectedEndOfStream {
                    field,
                    expected: buf.len(),
                    read: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}
