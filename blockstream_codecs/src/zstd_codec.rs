use blockstream_core::codec::Decompressor;

/// Zstandard frame decompressor.
///
/// Each payload is one complete zstd frame, decoded with the bulk API into
/// a buffer capped at the header's `raw_size`.
pub struct ZstdDecompressor;

impl Decompressor for ZstdDecompressor {
    fn name(&self) -> &'static str {
        "zstd"
    }

    fn decompress(&self, compressed: &[u8], raw_len: usize) -> anyhow::Result<Vec<u8>> {
        let raw = zstd::bulk::decompress(compressed, raw_len)?;
        if raw.len() != raw_len {
            anyhow::bail!("zstd frame expanded to {} bytes, expected {}", raw.len(), raw_len);
        }
        Ok(raw)
    }
}
