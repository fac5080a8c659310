pub mod checksum;
pub mod codec;
pub mod config;
pub mod error;
pub mod format;
pub mod framer;
pub mod source;
pub mod stream;

pub use checksum::{Digest, FrameChecksum, Xxh3Checksum};
pub use codec::Decompressor;
pub use config::DecoderConfig;
pub use error::{Error, ErrorKind, Result};
pub use format::{FrameHeader, FORMAT_TAG_LZ4, FRAME_HEADER_SIZE};
pub use framer::{BlockFramer, DecodedBlock, Frame};
pub use source::ByteSource;
pub use stream::{BlockStream, ByteStream};
