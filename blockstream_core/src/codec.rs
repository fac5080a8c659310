/// Core decompression abstraction.
///
/// Each `Decompressor` implementation:
/// - Expands one frame's payload independently of every other frame. No
///   cross-frame state is permitted; frames are decoded strictly one at a
///   time, in arrival order.
/// - Is told the exact decompressed length up front (the frame's
///   `raw_size`) and must fail rather than return a buffer of any other
///   length.
///
/// The payload handed to `decompress` has already passed the frame's
/// integrity check, so a failure here means the writer produced content the
/// codec cannot parse, or the size accounting in the header is inconsistent.
pub trait Decompressor: Send + Sync {
    /// Human-readable codec name for CLI display.
    fn name(&self) -> &'static str;

    /// Decompress a single frame payload into exactly `raw_len` bytes.
    fn decompress(&self, compressed: &[u8], raw_len: usize) -> anyhow::Result<Vec<u8>>;
}
