use std::io::{self, Read};

use tracing::{debug, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::framer::{BlockFramer, DecodedBlock};
use crate::source::ByteSource;

/// Byte-stream operations exposed over a sequence of decoded frames.
pub trait ByteStream {
    /// Read a single byte, or `None` at end-of-stream.
    fn read_one(&mut self) -> Result<Option<u8>>;

    /// Read up to `length` bytes into `buffer[offset..offset + length]`.
    ///
    /// Returns the number of bytes written; `0` for a non-zero `length`
    /// means end-of-stream.
    fn read_into(&mut self, buffer: &mut [u8], offset: usize, length: usize) -> Result<usize>;

    /// Non-blocking hint of how many bytes can be read right now. `0` is
    /// always a legal answer and does not imply end-of-stream.
    fn available_estimate(&self) -> usize;

    /// Release the underlying source.
    fn close(&mut self) -> Result<()>;
}

/// Flat, uncompressed view of a framed byte source.
///
/// Frames are pulled from the source one at a time, only when the caller
/// asks for bytes beyond the current block. A bulk read may span any number
/// of frames; it comes back short only when the source ends cleanly at a
/// frame boundary, and an error in any frame it touches fails the whole
/// call.
///
/// Frames with a `raw_size` of zero are skipped.
///
/// The first frame error is fatal: every later read returns
/// [`Error::Failed`] with the same kind and never touches the source again.
pub struct BlockStream<R> {
    source: Option<R>,
    framer: BlockFramer,
    current: Option<DecodedBlock>,
    /// Read position within `current`; `position == current.len()` means the
    /// block is used up.
    position: usize,
    frames_decoded: u64,
    /// Kind and message of the first frame error.
    failure: Option<(ErrorKind, String)>,
}

impl<R: ByteSource> BlockStream<R> {
    pub fn new(source: R, framer: BlockFramer) -> Self {
        Self {
            source: Some(source),
            framer,
            current: None,
            position: 0,
            frames_decoded: 0,
            failure: None,
        }
    }

    pub fn framer(&self) -> &BlockFramer {
        &self.framer
    }

    /// Number of frames decoded so far, including empty ones.
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }

    /// The underlying source, or `None` once the stream is closed.
    pub fn get_ref(&self) -> Option<&R> {
        self.source.as_ref()
    }

    /// Take back the underlying source without closing it. Any bytes still
    /// buffered in the current block are lost.
    pub fn into_inner(self) -> Option<R> {
        self.source
    }

    /// Unread bytes of the current block.
    fn remaining(&self) -> &[u8] {
        match &self.current {
            Some(block) => &block[self.position..],
            None => &[],
        }
    }

    /// The error a stream that already failed keeps returning.
    fn check_usable(&self) -> Result<()> {
        if self.source.is_none() {
            return Err(Error::Closed);
        }
        if let Some((kind, reason)) = &self.failure {
            return Err(Error::Failed {
                kind: *kind,
                reason: reason.clone(),
            });
        }
        Ok(())
    }

    /// Make sure the current block has unread bytes, pulling frames as
    /// needed. Returns `false` at end-of-stream.
    fn fill_block(&mut self) -> Result<bool> {
        if !self.remaining().is_empty() {
            return Ok(true);
        }
        self.check_usable()?;
        let source = self.source.as_mut().ok_or(Error::Closed)?;
        // drop the used-up block before decoding the next one
        self.current = None;
        self.position = 0;
        loop {
            let next = match self.framer.next_frame(source) {
                Ok(next) => next,
                Err(err) => {
                    warn!(frames = self.frames_decoded, error = %err, "stream failed");
                    self.failure = Some((err.kind(), err.to_string()));
                    return Err(err);
                }
            };
            match next {
                Some(block) => {
                    self.frames_decoded += 1;
                    if block.is_empty() {
                        continue;
                    }
                    self.current = Some(block);
                    return Ok(true);
                }
                None => {
                    debug!(frames = self.frames_decoded, "stream exhausted");
                    return Ok(false);
                }
            }
        }
    }
}

impl<R: ByteSource> ByteStream for BlockStream<R> {
    fn read_one(&mut self) -> Result<Option<u8>> {
        if !self.fill_block()? {
            return Ok(None);
        }
        let byte = self.remaining()[0];
        self.position += 1;
        Ok(Some(byte))
    }

    fn read_into(&mut self, buffer: &mut [u8], offset: usize, length: usize) -> Result<usize> {
        let end = offset
            .checked_add(length)
            .filter(|&end| end <= buffer.len())
            .ok_or(Error::InvalidArgument {
                offset,
                length,
                capacity: buffer.len(),
            })?;
        if length == 0 {
            return Ok(0);
        }
        self.check_usable()?;

        let target = &mut buffer[offset..end];
        let mut copied = 0;
        while copied < target.len() {
            if !self.fill_block()? {
                break;
            }
            let available = self.remaining();
            let n = available.len().min(target.len() - copied);
            target[copied..copied + n].copy_from_slice(&available[..n]);
            self.position += n;
            copied += n;
        }
        Ok(copied)
    }

    fn available_estimate(&self) -> usize {
        let Some(source) = &self.source else {
            return 0;
        };
        if self.failure.is_some() {
            return 0;
        }
        match source.available_estimate() {
            0 => self.remaining().len(),
            estimate => estimate,
        }
    }

    fn close(&mut self) -> Result<()> {
        self.current = None;
        self.position = 0;
        if let Some(mut source) = self.source.take() {
            source.close()?;
            debug!(frames = self.frames_decoded, "stream closed");
        }
        Ok(())
    }
}

impl<R: ByteSource> Read for BlockStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        Ok(self.read_into(buf, 0, len)?)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Arc;

    use super::*;
    use crate::checksum::{FrameChecksum, Xxh3Checksum};
    use crate::codec::Decompressor;
    use crate::config::DecoderConfig;
    use crate::format::{FrameHeader, CHECKSUM_SIZE, FORMAT_TAG_LZ4, SIZE_FIELDS_LEN};

    struct Identity;

    impl Decompressor for Identity {
        fn name(&self) -> &'static str {
            "identity"
        }

        fn decompress(&self, compressed: &[u8], _raw_len: usize) -> anyhow::Result<Vec<u8>> {
            Ok(compressed.to_vec())
        }
    }

    /// Counts bytes handed out and records closing.
    struct Tracked {
        inner: Cursor<Vec<u8>>,
        bytes_read: usize,
        closed: usize,
        estimate: usize,
    }

    impl Tracked {
        fn new(wire: Vec<u8>) -> Self {
            Self {
                inner: Cursor::new(wire),
                bytes_read: 0,
                closed: 0,
                estimate: 0,
            }
        }
    }

    impl Read for Tracked {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            let n = self.inner.read(buf)?;
            self.bytes_read += n;
            Ok(n)
        }
    }

    impl ByteSource for Tracked {
        fn available_estimate(&self) -> usize {
            self.estimate
        }

        fn close(&mut self) -> io::Result<()> {
            self.closed += 1;
            Ok(())
        }
    }

    fn frame(payload: &[u8]) -> Vec<u8> {
        let mut header = FrameHeader {
            checksum: [0u8; CHECKSUM_SIZE],
            format_tag: FORMAT_TAG_LZ4,
            frame_size: (payload.len() + SIZE_FIELDS_LEN) as i32,
            raw_size: payload.len() as i32,
        };
        let mut covered = header.covered_prefix().to_vec();
        covered.extend_from_slice(payload);
        header.checksum = Xxh3Checksum.encode_wire(Xxh3Checksum.compute(&covered));
        let mut out = header.to_bytes().to_vec();
        out.extend_from_slice(payload);
        out
    }

    fn stream(frames: &[&str]) -> BlockStream<Tracked> {
        let wire: Vec<u8> = frames.iter().flat_map(|p| frame(p.as_bytes())).collect();
        let framer = BlockFramer::new(
            Arc::new(Xxh3Checksum),
            Arc::new(Identity),
            DecoderConfig::default(),
        );
        BlockStream::new(Tracked::new(wire), framer)
    }

    #[test]
    fn read_one_walks_every_frame() {
        let mut s = stream(&["ab", "c", "de"]);
        let mut out = Vec::new();
        while let Some(b) = s.read_one().unwrap() {
            out.push(b);
        }
        assert_eq!(out, b"abcde");
        assert_eq!(s.frames_decoded(), 3);
        assert_eq!(s.read_one().unwrap(), None);
    }

    #[test]
    fn bulk_read_spans_frames() {
        let mut s = stream(&["abc", "defg", "hi"]);
        let mut buf = [0u8; 16];
        let n = s.read_into(&mut buf, 2, 8).unwrap();
        assert_eq!(n, 8);
        assert_eq!(&buf[2..10], b"abcdefgh");
        assert_eq!(&buf[..2], &[0, 0]);

        let n = s.read_into(&mut buf, 0, 16).unwrap();
        assert_eq!(n, 1);
        assert_eq!(buf[0], b'i');
        assert_eq!(s.read_into(&mut buf, 0, 16).unwrap(), 0);
    }

    #[test]
    fn exact_fill_does_not_fetch_next_frame() {
        let first = frame(b"abcd");
        let mut s = stream(&["abcd", "efgh"]);
        let mut buf = [0u8; 4];
        assert_eq!(s.read_into(&mut buf, 0, 4).unwrap(), 4);
        assert_eq!(&buf, b"abcd");
        assert_eq!(s.get_ref().unwrap().bytes_read, first.len());
    }

    #[test]
    fn zero_length_read_touches_nothing() {
        let mut s = stream(&["abc"]);
        let mut buf = [0u8; 4];
        assert_eq!(s.read_into(&mut buf, 4, 0).unwrap(), 0);
        assert_eq!(s.get_ref().unwrap().bytes_read, 0);
    }

    #[test]
    fn out_of_bounds_read_is_invalid_argument() {
        let mut s = stream(&["abc"]);
        let mut buf = [0u8; 4];
        for (offset, length) in [(0, 5), (3, 2), (5, 0), (usize::MAX, 2)] {
            let err = s.read_into(&mut buf, offset, length).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
        assert_eq!(s.get_ref().unwrap().bytes_read, 0);
    }

    #[test]
    fn empty_frames_are_skipped() {
        let mut s = stream(&["", "x", "", "", "yz", ""]);
        let mut out = Vec::new();
        s.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"xyz");
        assert_eq!(s.frames_decoded(), 6);
    }

    #[test]
    fn available_prefers_source_estimate() {
        let mut s = stream(&["abcdef"]);
        assert_eq!(s.available_estimate(), 0);
        s.read_one().unwrap();
        assert_eq!(s.available_estimate(), 5);
        s.source.as_mut().unwrap().estimate = 42;
        assert_eq!(s.available_estimate(), 42);
    }

    #[test]
    fn later_frame_error_fails_whole_read() {
        let mut wire = frame(b"good");
        let mut bad = frame(b"bad!");
        let last = bad.len() - 1;
        bad[last] ^= 0x01;
        wire.extend(bad);
        let framer = BlockFramer::new(
            Arc::new(Xxh3Checksum),
            Arc::new(Identity),
            DecoderConfig::default(),
        );
        let mut s = BlockStream::new(Tracked::new(wire), framer);
        let mut buf = [0u8; 8];
        let err = s.read_into(&mut buf, 0, 8).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
    }

    #[test]
    fn stream_stays_failed_after_checksum_error() {
        let mut wire = frame(b"AAAA");
        let mut bad = frame(b"BBBB");
        let last = bad.len() - 1;
        bad[last] ^= 0x01;
        wire.extend(bad);
        wire.extend(frame(b"CCCC"));
        let framer = BlockFramer::new(
            Arc::new(Xxh3Checksum),
            Arc::new(Identity),
            DecoderConfig::default(),
        );
        let mut s = BlockStream::new(Tracked::new(wire), framer);

        let mut buf = [0u8; 6];
        let err = s.read_into(&mut buf, 0, 6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
        let consumed = s.get_ref().unwrap().bytes_read;

        for _ in 0..2 {
            let err = s.read_one().unwrap_err();
            assert!(matches!(err, Error::Failed { .. }), "got: {err}");
            assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
        }
        let err = s.read_into(&mut buf, 0, 6).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ChecksumMismatch);
        assert_eq!(s.available_estimate(), 0);
        assert_eq!(s.get_ref().unwrap().bytes_read, consumed);

        // zero-length reads and close still behave
        assert_eq!(s.read_into(&mut buf, 0, 0).unwrap(), 0);
        s.close().unwrap();
        assert_eq!(s.read_one().unwrap_err().kind(), ErrorKind::Closed);
    }

    #[test]
    fn stream_stays_failed_after_bad_tag() {
        let mut wire = frame(b"ok");
        let mut bad = frame(b"xy");
        bad[CHECKSUM_SIZE] = 0x90;
        wire.extend(bad);
        wire.extend(frame(b"zz"));
        let framer = BlockFramer::new(
            Arc::new(Xxh3Checksum),
            Arc::new(Identity),
            DecoderConfig::default(),
        );
        let mut s = BlockStream::new(Tracked::new(wire), framer);

        assert_eq!(s.read_one().unwrap(), Some(b'o'));
        assert_eq!(s.read_one().unwrap(), Some(b'k'));
        assert_eq!(s.read_one().unwrap_err().kind(), ErrorKind::InvalidFormatTag);
        assert_eq!(s.read_one().unwrap_err().kind(), ErrorKind::InvalidFormatTag);
        let mut out = Vec::new();
        let err = s.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert!(out.is_empty());
    }

    #[test]
    fn close_is_idempotent_and_final() {
        let mut s = stream(&["abc"]);
        assert_eq!(s.read_one().unwrap(), Some(b'a'));
        s.close().unwrap();
        s.close().unwrap();
        assert!(s.get_ref().is_none());
        assert_eq!(s.available_estimate(), 0);
        assert_eq!(s.read_one().unwrap_err().kind(), ErrorKind::Closed);
        let mut buf = [0u8; 2];
        assert_eq!(s.read_into(&mut buf, 0, 2).unwrap_err().kind(), ErrorKind::Closed);
    }

    #[test]
    fn close_reaches_the_source() {
        let mut s = stream(&["abc"]);
        s.close().unwrap();
        let source = s.into_inner();
        assert!(source.is_none());

        let framer = BlockFramer::new(
            Arc::new(Xxh3Checksum),
            Arc::new(Identity),
            DecoderConfig::default(),
        );
        let mut tracked = Tracked::new(Vec::new());
        {
            let mut borrowed = BlockStream::new(&mut tracked, framer);
            borrowed.close().unwrap();
        }
        assert_eq!(tracked.closed, 1);
    }

    #[test]
    fn io_read_maps_errors() {
        let mut wire = frame(b"data");
        wire.truncate(wire.len() - 2);
        let framer = BlockFramer::new(
            Arc::new(Xxh3Checksum),
            Arc::new(Identity),
            DecoderConfig::default(),
        );
        let mut s = BlockStream::new(Tracked::new(wire), framer);
        let mut out = Vec::new();
        let err = s.read_to_end(&mut out).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
