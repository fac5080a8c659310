use blockstream_core::codec::Decompressor;

/// LZ4 raw-block decompressor.
///
/// Frames tagged `0x82` carry a bare LZ4 block with no size prefix; the
/// output length comes from the frame header, so the output buffer is
/// sized up front and the block must fill it exactly.
///
/// Best for: the default ClickHouse `compress=1` stream.
pub struct Lz4Decompressor;

impl Decompressor for Lz4Decompressor {
    fn name(&self) -> &'static str {
        "lz4"
    }

    fn decompress(&self, compressed: &[u8], raw_len: usize) -> anyhow::Result<Vec<u8>> {
        let mut raw = vec![0u8; raw_len];
        let written = lz4_flex::block::decompress_into(compressed, &mut raw)
            .map_err(|e| anyhow::anyhow!("lz4 decompress error: {}", e))?;
        if written != raw_len {
            anyhow::bail!("lz4 block expanded to {} bytes, expected {}", written, raw_len);
        }
        Ok(raw)
    }
}
