mod cityhash;
mod lz4_codec;
mod passthrough;
mod zstd_codec;

pub use cityhash::CityHash128;
pub use lz4_codec::Lz4Decompressor;
pub use passthrough::PassThroughDecompressor;
pub use zstd_codec::ZstdDecompressor;

use blockstream_core::format::{FORMAT_TAG_LZ4, FORMAT_TAG_NONE, FORMAT_TAG_ZSTD};
use blockstream_core::{Decompressor, FrameChecksum, Xxh3Checksum};
use std::sync::Arc;

/// Resolve the format tag frames carry for a compression method name.
pub fn tag_for_method(name: &str) -> anyhow::Result<u8> {
    match name {
        "lz4" | "l" => Ok(FORMAT_TAG_LZ4),
        "zstd" | "z" => Ok(FORMAT_TAG_ZSTD),
        "none" | "passthrough" | "pass" => Ok(FORMAT_TAG_NONE),
        other => anyhow::bail!("unknown method '{}'. Valid options: lz4, zstd, none", other),
    }
}

/// Resolve a decompressor from a frame's format tag.
///
/// Used by the CLI to pair the tag a stream is expected to carry with the
/// codec that can expand its payloads.
pub fn decompressor_for_tag(tag: u8) -> anyhow::Result<Arc<dyn Decompressor>> {
    match tag {
        FORMAT_TAG_LZ4 => Ok(Arc::new(Lz4Decompressor)),
        FORMAT_TAG_ZSTD => Ok(Arc::new(ZstdDecompressor)),
        FORMAT_TAG_NONE => Ok(Arc::new(PassThroughDecompressor)),
        _ => anyhow::bail!(
            "unknown format tag 0x{:02x}; supported: 0x82 (lz4), 0x90 (zstd), 0x02 (none)",
            tag
        ),
    }
}

/// Resolve a frame checksum by name.
pub fn checksum_by_name(name: &str) -> anyhow::Result<Arc<dyn FrameChecksum>> {
    match name {
        "city" | "cityhash" | "cityhash128" => Ok(Arc::new(CityHash128)),
        "xxh3" | "xxh3-128" => Ok(Arc::new(Xxh3Checksum)),
        other => anyhow::bail!("unknown checksum '{}'. Valid options: city, xxh3", other),
    }
}
