use crate::format::FORMAT_TAG_LZ4;

/// Default upper bound for both size fields: 1 GiB, the largest block a
/// ClickHouse server will emit.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1 << 30;

/// Decoder settings shared by [`BlockFramer`](crate::BlockFramer) and
/// [`BlockStream`](crate::BlockStream).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderConfig {
    /// The only format tag accepted on this stream.
    pub format_tag: u8,
    /// Largest accepted `frame_size`, checked before the payload buffer is
    /// allocated.
    pub max_frame_size: usize,
    /// Largest accepted `raw_size`, checked before decompression.
    pub max_raw_size: usize,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            format_tag: FORMAT_TAG_LZ4,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_raw_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl DecoderConfig {
    pub fn with_format_tag(mut self, format_tag: u8) -> Self {
        self.format_tag = format_tag;
        self
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.max_frame_size = max_frame_size;
        self
    }

    pub fn with_max_raw_size(mut self, max_raw_size: usize) -> Self {
        self.max_raw_size = max_raw_size;
        self
    }
}
