use std::io;

use crate::checksum::Digest;

/// Errors raised while decoding a framed, block-compressed stream.
///
/// Every variant is fatal for the stream that produced it: nothing is
/// retried here, and a clean end-of-stream is never reported as an error.
///
/// ```text
///   Error
///   ├── UnexpectedEndOfStream   ← source ran dry inside a frame
///   ├── InvalidFormatTag        ← tag byte differs from the configured tag
///   ├── InvalidFrameSize        ← frame_size < 9
///   ├── InvalidRawSize          ← raw_size < 0
///   ├── FrameTooLarge           ← size field above the configured limit
///   ├── ChecksumMismatch        ← header digest != recomputed digest
///   ├── DecompressionFailed     ← payload did not expand to raw_size bytes
///   ├── InvalidArgument         ← caller buffer bounds violated
///   ├── Closed                  ← stream used after close()
///   ├── Failed                  ← stream used after an earlier fatal error
///   └── Io(std::io::Error)      ← any other failure of the byte source
/// ```
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The byte source was exhausted part-way through a frame.
    #[error("unexpected end of stream while reading {field}: expected {expected} bytes, got {read}")]
    UnexpectedEndOfStream {
        field: &'static str,
        expected: usize,
        read: usize,
    },

    /// The frame's format tag does not match the one the stream expects.
    #[error("invalid format tag 0x{found:02x} (expected 0x{expected:02x})")]
    InvalidFormatTag { found: u8, expected: u8 },

    /// `frame_size` is too small to cover the tag and size fields.
    #[error("invalid frame size {frame_size}: must be at least 9")]
    InvalidFrameSize { frame_size: i32 },

    /// `raw_size` is negative.
    #[error("invalid raw size {raw_size}")]
    InvalidRawSize { raw_size: i32 },

    /// A size field exceeds the limit configured in
    /// [`DecoderConfig`](crate::DecoderConfig). Checked before any
    /// allocation is made for the frame.
    #[error("{field} {size} exceeds limit {limit}")]
    FrameTooLarge {
        field: &'static str,
        size: usize,
        limit: usize,
    },

    /// The digest recomputed over the frame does not match its header.
    #[error("checksum mismatch: header says {expected}, computed {actual} (corrupted data)")]
    ChecksumMismatch { expected: Digest, actual: Digest },

    /// The payload passed the integrity check but could not be expanded to
    /// exactly `raw_size` bytes.
    #[error("decompression failed: {reason}")]
    DecompressionFailed { reason: String },

    /// `offset + length` does not fit the caller's buffer.
    #[error("invalid argument: offset {offset} + length {length} exceeds buffer of {capacity} bytes")]
    InvalidArgument {
        offset: usize,
        length: usize,
        capacity: usize,
    },

    /// The stream has been closed.
    #[error("stream is closed")]
    Closed,

    /// An earlier read failed and left the stream unusable. Carries the
    /// kind and message of that first failure.
    #[error("stream failed earlier: {reason}")]
    Failed { kind: ErrorKind, reason: String },

    /// An I/O error from the underlying byte source.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Coarse classification of an [`Error`].
///
/// Malformed size fields are reported under `InvalidFormatTag`: like a bad
/// tag, they mean the reader is out of step with the writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnexpectedEndOfStream,
    InvalidFormatTag,
    ChecksumMismatch,
    DecompressionFailed,
    InvalidArgument,
    Closed,
    Io,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnexpectedEndOfStream { .. } => ErrorKind::UnexpectedEndOfStream,
            Error::InvalidFormatTag { .. }
            | Error::InvalidFrameSize { .. }
            | Error::InvalidRawSize { .. }
            | Error::FrameTooLarge { .. } => ErrorKind::InvalidFormatTag,
            Error::ChecksumMismatch { .. } => ErrorKind::ChecksumMismatch,
            Error::DecompressionFailed { .. } => ErrorKind::DecompressionFailed,
            Error::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Error::Closed => ErrorKind::Closed,
            Error::Failed { kind, .. } => *kind,
            Error::Io(_) => ErrorKind::Io,
        }
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        if let Error::Io(inner) = err {
            return inner;
        }
        let kind = match err.kind() {
            ErrorKind::UnexpectedEndOfStream => io::ErrorKind::UnexpectedEof,
            ErrorKind::InvalidFormatTag
            | ErrorKind::ChecksumMismatch
            | ErrorKind::DecompressionFailed => io::ErrorKind::InvalidData,
            ErrorKind::InvalidArgument => io::ErrorKind::InvalidInput,
            ErrorKind::Closed | ErrorKind::Io => io::ErrorKind::Other,
        };
        io::Error::new(kind, err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;
