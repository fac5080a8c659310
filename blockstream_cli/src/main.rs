use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use blockstream_codecs::{checksum_by_name, decompressor_for_tag, tag_for_method};
use blockstream_core::config::DEFAULT_MAX_FRAME_SIZE;
use blockstream_core::format::FRAME_HEADER_SIZE;
use blockstream_core::{BlockFramer, BlockStream, ByteSource, ByteStream, DecoderConfig};

// ── CLI definition ─────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "blockstream",
    about = "Decode and inspect checksummed, block-compressed byte streams",
    version
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins if set.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Decoder settings shared by every subcommand.
#[derive(Args, Clone)]
struct DecodeOpts {
    /// Compression method the frames are tagged with: lz4 | zstd | none
    #[arg(short, long, default_value = "lz4")]
    method: String,
    /// Frame checksum algorithm: city | xxh3
    #[arg(short, long, default_value = "city")]
    checksum: String,
    /// Reject frames whose frame_size or raw_size exceeds this many bytes
    #[arg(long, default_value_t = DEFAULT_MAX_FRAME_SIZE)]
    max_frame_size: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode a framed stream back to raw bytes
    Decompress {
        /// Framed input ("-" reads stdin)
        input: PathBuf,
        /// Destination file ("-" writes to stdout)
        output: PathBuf,
        #[command(flatten)]
        opts: DecodeOpts,
        /// Bytes requested from the stream per read
        #[arg(short, long, default_value_t = 64 * 1024)]
        buffer_size: usize,
    },
    /// Walk every frame and print header statistics
    Inspect {
        /// Framed input file
        file: PathBuf,
        #[command(flatten)]
        opts: DecodeOpts,
        /// Print per-frame details
        #[arg(long)]
        frames: bool,
    },
    /// Measure decode throughput with a fixed read size
    Bench {
        /// Framed input file
        file: PathBuf,
        #[command(flatten)]
        opts: DecodeOpts,
        /// Bytes requested from the stream per read
        #[arg(short, long, default_value_t = 64 * 1024)]
        read_size: usize,
        /// Number of full passes over the file
        #[arg(long, default_value_t = 3)]
        passes: u32,
    },
}

// ── Helpers ────────────────────────────────────────────────────────────────

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}

fn build_framer(opts: &DecodeOpts) -> anyhow::Result<BlockFramer> {
    let tag = tag_for_method(&opts.method)?;
    let config = DecoderConfig::default()
        .with_format_tag(tag)
        .with_max_frame_size(opts.max_frame_size)
        .with_max_raw_size(opts.max_frame_size);
    Ok(BlockFramer::new(
        checksum_by_name(&opts.checksum)?,
        decompressor_for_tag(tag)?,
        config,
    ))
}

fn open_source(input: &Path) -> anyhow::Result<Box<dyn ByteSource>> {
    if input.to_str() == Some("-") {
        return Ok(Box::new(io::stdin().lock()));
    }
    let file = File::open(input).with_context(|| format!("opening input file {:?}", input))?;
    Ok(Box::new(BufReader::new(file)))
}

fn human_bytes(n: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    let mut v = n as f64;
    let mut unit = 0;
    while v >= 1024.0 && unit < UNITS.len() - 1 {
        v /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} B", n)
    } else {
        format!("{:.2} {}", v, UNITS[unit])
    }
}

fn throughput(bytes: u64, secs: f64) -> String {
    if secs <= 0.0 {
        return "n/a".to_string();
    }
    format!("{}/s", human_bytes((bytes as f64 / secs) as u64))
}

// ── Subcommand implementations ─────────────────────────────────────────────

fn run_decompress(
    input: PathBuf,
    output: PathBuf,
    opts: DecodeOpts,
    buffer_size: usize,
) -> anyhow::Result<()> {
    if buffer_size == 0 {
        anyhow::bail!("--buffer-size must be at least 1");
    }
    let framer = build_framer(&opts)?;
    let codec = framer.decompressor().name();
    let checksum = framer.checksum().name();
    let mut stream = BlockStream::new(open_source(&input)?, framer);

    let is_stdout = output.to_str() == Some("-");
    let mut dst: Box<dyn Write> = if is_stdout {
        Box::new(io::stdout().lock())
    } else {
        Box::new(
            File::create(&output).with_context(|| format!("creating output file {:?}", output))?,
        )
    };

    info!(?input, codec, checksum, "decoding stream");
    let t0 = Instant::now();
    let mut total_raw = 0u64;
    let mut buf = vec![0u8; buffer_size];
    loop {
        let n = stream
            .read_into(&mut buf, 0, buffer_size)
            .with_context(|| format!("decoding frame {}", stream.frames_decoded() + 1))?;
        if n == 0 {
            break;
        }
        dst.write_all(&buf[..n])?;
        total_raw += n as u64;
    }
    dst.flush()?;
    let frames = stream.frames_decoded();
    stream.close()?;

    let elapsed = t0.elapsed();
    eprintln!("  codec       : {} / {}", codec, checksum);
    eprintln!("  frames      : {}", frames);
    eprintln!("  raw size    : {}", human_bytes(total_raw));
    eprintln!("  throughput  : {}", throughput(total_raw, elapsed.as_secs_f64()));
    eprintln!("  elapsed     : {:.3}s", elapsed.as_secs_f64());
    Ok(())
}

fn run_inspect(file: PathBuf, opts: DecodeOpts, show_frames: bool) -> anyhow::Result<()> {
    let framer = build_framer(&opts)?;
    let mut source = open_source(&file)?;

    println!("=== Framed stream: {:?} ===", file);
    println!();
    if show_frames {
        println!(
            "  {:>8}  {:>14}  {:>12}  {:>12}  {:>32}",
            "frame", "offset", "compressed", "raw", "checksum"
        );
        println!("  {}", "-".repeat(86));
    }

    let mut offset = 0u64;
    let mut frame_count = 0u64;
    let mut total_compressed = 0u64;
    let mut total_raw = 0u64;
    let mut largest_raw = 0usize;

    while let Some(frame) = framer
        .next_frame_with_header(&mut source)
        .with_context(|| format!("frame {} at offset {}", frame_count, offset))?
    {
        let compressed_len = frame.header.compressed_len()?;
        if show_frames {
            println!(
                "  {:>8}  {:>14}  {:>12}  {:>12}  {}",
                frame_count,
                offset,
                human_bytes(compressed_len as u64),
                human_bytes(frame.block.len() as u64),
                framer.checksum().decode_wire(&frame.header.checksum)
            );
        }
        offset += (FRAME_HEADER_SIZE + compressed_len) as u64;
        frame_count += 1;
        total_compressed += compressed_len as u64;
        total_raw += frame.block.len() as u64;
        largest_raw = largest_raw.max(frame.block.len());
    }
    source.close()?;

    if show_frames {
        println!();
    }
    println!(
        "  method         : {} (tag=0x{:02x})",
        framer.decompressor().name(),
        framer.config().format_tag
    );
    println!("  checksum       : {}", framer.checksum().name());
    println!("  frames         : {}", frame_count);
    println!("  stream size    : {}", human_bytes(offset));
    println!("  payload bytes  : {}", human_bytes(total_compressed));
    println!("  raw size       : {}", human_bytes(total_raw));
    println!("  largest frame  : {}", human_bytes(largest_raw as u64));
    if total_compressed > 0 {
        println!("  ratio          : {:.2}x", total_raw as f64 / total_compressed as f64);
    }
    Ok(())
}

fn run_bench(file: PathBuf, opts: DecodeOpts, read_size: usize, passes: u32) -> anyhow::Result<()> {
    if read_size == 0 {
        anyhow::bail!("--read-size must be at least 1");
    }
    if passes == 0 {
        anyhow::bail!("--passes must be at least 1");
    }
    // Load once so the benchmark measures decoding, not disk I/O.
    let wire = std::fs::read(&file).with_context(|| format!("reading {:?}", file))?;

    eprintln!(
        "benchmarking {} passes over {} with {}-byte reads...",
        passes,
        human_bytes(wire.len() as u64),
        read_size
    );

    let mut buf = vec![0u8; read_size];
    let mut timings = Vec::with_capacity(passes as usize);
    let mut total_raw = 0u64;
    let mut frames = 0u64;

    for _ in 0..passes {
        let mut stream = BlockStream::new(wire.as_slice(), build_framer(&opts)?);
        let t = Instant::now();
        total_raw = 0;
        loop {
            let n = stream.read_into(&mut buf, 0, read_size)?;
            if n == 0 {
                break;
            }
            total_raw += n as u64;
        }
        timings.push(t.elapsed().as_secs_f64());
        frames = stream.frames_decoded();
    }

    timings.sort_by(|a, b| a.total_cmp(b));
    let best = timings[0];
    let median = timings[timings.len() / 2];

    println!();
    println!("=== Decode Benchmark ===");
    println!("  frames      : {}", frames);
    println!("  raw size    : {}", human_bytes(total_raw));
    println!("  read size   : {}", human_bytes(read_size as u64));
    println!("  best        : {:.3}s ({})", best, throughput(total_raw, best));
    println!("  median      : {:.3}s ({})", median, throughput(total_raw, median));
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match cli.command {
        Commands::Decompress {
            input,
            output,
            opts,
            buffer_size,
        } => run_decompress(input, output, opts, buffer_size),
        Commands::Inspect { file, opts, frames } => run_inspect(file, opts, frames),
        Commands::Bench {
            file,
            opts,
            read_size,
            passes,
        } => run_bench(file, opts, read_size, passes),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn framer_follows_method_and_checksum() {
        let opts = DecodeOpts {
            method: "zstd".to_string(),
            checksum: "xxh3".to_string(),
            max_frame_size: 4096,
        };
        let framer = build_framer(&opts).unwrap();
        assert_eq!(framer.config().format_tag, 0x90);
        assert_eq!(framer.decompressor().name(), "zstd");
        assert_eq!(framer.checksum().name(), "xxh3-128");

        let bad = DecodeOpts {
            method: "gzip".to_string(),
            ..opts
        };
        assert!(build_framer(&bad).is_err());
    }

    #[test]
    fn human_bytes_scales() {
        assert_eq!(human_bytes(512), "512 B");
        assert_eq!(human_bytes(2048), "2.00 KB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3.00 MB");
    }

    #[test]
    fn parses_decompress_flags() {
        let cli = Cli::try_parse_from([
            "blockstream",
            "-vv",
            "decompress",
            "in.bin",
            "-",
            "--method",
            "zstd",
            "--checksum",
            "xxh3",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Decompress { output, opts, .. } => {
                assert_eq!(output, PathBuf::from("-"));
                let framer = build_framer(&opts).unwrap();
                assert_eq!(framer.config().format_tag, 0x90);
                assert_eq!(framer.checksum().name(), "xxh3-128");
            }
            _ => panic!("expected decompress"),
        }
    }
}
