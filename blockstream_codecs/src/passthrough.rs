use blockstream_core::codec::Decompressor;

/// No-op decompressor for frames whose payload is stored verbatim.
pub struct PassThroughDecompressor;

impl Decompressor for PassThroughDecompressor {
    fn name(&self) -> &'static str {
        "none"
    }

    fn decompress(&self, compressed: &[u8], raw_len: usize) -> anyhow::Result<Vec<u8>> {
        if compressed.len() != raw_len {
            anyhow::bail!(
                "stored payload is {} bytes but raw size is {}",
                compressed.len(),
                raw_len
            );
        }
        Ok(compressed.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copies_payload() {
        let out = PassThroughDecompressor.decompress(b"verbatim", 8).unwrap();
        assert_eq!(out, b"verbatim");
    }

    #[test]
    fn length_mismatch_is_an_error() {
        assert!(PassThroughDecompressor.decompress(b"verbatim", 9).is_err());
    }
}
