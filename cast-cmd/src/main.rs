mod cli;
mod size;

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::time::Instant;

use anyhow::{bail, Context};
use cast_lib::codec::{FallbackCodec, DEFAULT_DICT_SIZE};
use cast_lib::{compress_block, CompressOptions, Frame, HEADER_LEN};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use size::parse_human_size;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    println!("\n|--    CAST: Columnar Agnostic Structural Transformation    --|\n");

    match cli.command {
        Command::Compress { input, output, chunk_size, dict_size, verify } => {
            let chunk_size = chunk_size.as_deref().map(parse_human_size).transpose()?;
            let dict_size = dict_size.as_deref().map(parse_human_size).transpose()?;
            let dict_size = match dict_size {
                Some(size) => u32::try_from(size).context("--dict-size is too large")?,
                None => DEFAULT_DICT_SIZE,
            };
            do_compress(&input, &output, chunk_size, dict_size, verify)
        }
        Command::Decompress { input, output } => do_decompress(&input, &output),
        Command::Verify { input } => do_verify(&input),
    }
}

fn format_bytes(n: u64) -> String {
    // Matches the reference CLI's thousands-separated formatting.
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().rev().enumerate() {
        if i > 0 && i % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    format!("{} bytes", out.chars().rev().collect::<String>())
}

fn do_compress(
    input_path: &Path,
    output_path: &Path,
    chunk_size: Option<u64>,
    dict_size: u32,
    verify: bool,
) -> anyhow::Result<()> {
    let start = Instant::now();

    let mode_str = match chunk_size {
        Some(size) => format!("CHUNKED ({})", format_bytes(size)),
        None => "SOLID (Single Block)".to_string(),
    };
    println!("      Input:      {}", input_path.display());
    println!("      Output:     {}", output_path.display());
    println!("      Mode:       {mode_str}");
    println!("      Dict Size:  {}", format_bytes(dict_size as u64));
    println!("\n[*]    Starting Compression...");

    let input_file = File::open(input_path)
        .with_context(|| format!("Input file '{}' not found", input_path.display()))?;
    let mut reader = BufReader::new(input_file);
    let mut writer = BufWriter::new(
        File::create(output_path)
            .with_context(|| format!("failed to create output file '{}'", output_path.display()))?,
    );

    let codec = FallbackCodec::new();
    let options = CompressOptions { dict_size };

    let mut chunk_idx = 0u64;
    let mut total_input = 0u64;
    let mut total_output = 0u64;

    loop {
        let chunk = read_chunk(&mut reader, chunk_size)?;
        if chunk.is_empty() {
            break;
        }
        chunk_idx += 1;
        total_input += chunk.len() as u64;

        print!("\r       Processing Chunk #{chunk_idx} ({})... ", format_bytes(chunk.len() as u64));
        std::io::stdout().flush().ok();

        let frame = compress_block(&chunk, &codec, &options)
            .with_context(|| format!("compression failed at chunk {chunk_idx}"))?
            .into_frame();
        let bytes = frame.to_bytes();
        total_output += bytes.len() as u64;
        writer.write_all(&bytes)?;
    }
    writer.flush()?;
    println!(" Done.");

    let ratio = if total_output > 0 { total_input as f64 / total_output as f64 } else { 0.0 };
    println!("\n[+]    Compression completed!");
    println!("       Chunks:         {chunk_idx}");
    println!("       Total Input:    {}", format_bytes(total_input));
    println!("       Total Output:   {}", format_bytes(total_output));
    println!("       Ratio:          {ratio:.2}x");
    println!("       Time:           {:.2}s", start.elapsed().as_secs_f64());

    if verify {
        println!("\n------------------------------------------------");
        println!("[*]   Starting Post-Compression Verification...");
        do_verify(output_path)?;
    }

    Ok(())
}

/// Reads one chunk from `reader`: exactly `chunk_size` bytes if set (the
/// final chunk may be shorter), or the entire remaining file in "Solid"
/// mode. Returns an empty vector at EOF.
fn read_chunk(reader: &mut impl Read, chunk_size: Option<u64>) -> anyhow::Result<Vec<u8>> {
    match chunk_size {
        Some(size) => {
            let mut buf = vec![0u8; size as usize];
            let mut filled = 0usize;
            while filled < buf.len() {
                let n = reader.read(&mut buf[filled..])?;
                if n == 0 {
                    break;
                }
                filled += n;
            }
            buf.truncate(filled);
            Ok(buf)
        }
        None => {
            let mut buf = Vec::new();
            reader.read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}

fn do_decompress(input_path: &Path, output_path: &Path) -> anyhow::Result<()> {
    let start = Instant::now();
    println!("\n[*]    Extracting stream...");

    let mut reader = BufReader::new(
        File::open(input_path).with_context(|| format!("Input file '{}' not found", input_path.display()))?,
    );
    let mut writer = BufWriter::new(
        File::create(output_path)
            .with_context(|| format!("failed to create output file '{}'", output_path.display()))?,
    );
    let codec = FallbackCodec::new();

    let mut chunk_idx = 0u64;
    while let Some(frame) = read_frame(&mut reader, chunk_idx)? {
        chunk_idx += 1;
        print!("\r       Extracting Chunk #{chunk_idx}...");
        std::io::stdout().flush().ok();
        let restored = cast_lib::decompress_block(&frame, &codec)
            .with_context(|| format!("decompression failed at chunk {chunk_idx}"))?;
        writer.write_all(&restored)?;
    }
    writer.flush()?;

    println!("\n\n[+]    Decompression done in {:.2}s", start.elapsed().as_secs_f64());
    Ok(())
}

fn do_verify(input_path: &Path) -> anyhow::Result<()> {
    let start = Instant::now();
    println!("\n[*]    Verifying Stream Integrity...");

    let mut reader = BufReader::new(
        File::open(input_path).with_context(|| format!("File '{}' not found", input_path.display()))?,
    );
    let codec = FallbackCodec::new();

    let mut chunk_idx = 0u64;
    while let Some(frame) = read_frame(&mut reader, chunk_idx)? {
        chunk_idx += 1;
        print!("\r       Verifying Chunk #{chunk_idx}... ");
        std::io::stdout().flush().ok();
        cast_lib::decompress_block(&frame, &codec)
            .with_context(|| format!("FAILURE at chunk {chunk_idx}"))?;
    }

    println!(
        "\n\n[+]    FILE INTEGRITY VERIFIED. Chunks: {chunk_idx}. Time: {:.2}s",
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Reads one block header-then-body pair off `reader`, returning `None` at
/// a clean EOF. A partial header (some bytes read, fewer than
/// [`HEADER_LEN`]) or a body shorter than declared is a fatal truncation.
fn read_frame(reader: &mut impl Read, chunk_idx: u64) -> anyhow::Result<Option<Frame>> {
    let mut header = vec![0u8; HEADER_LEN];
    let mut filled = 0usize;
    while filled < HEADER_LEN {
        let n = reader.read(&mut header[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    if filled == 0 {
        return Ok(None);
    }
    if filled < HEADER_LEN {
        bail!("unexpected EOF reading header at chunk {chunk_idx} (file truncated?)");
    }

    let c_reg_len = u32::from_le_bytes(header[4..8].try_into().unwrap()) as usize;
    let c_ids_len = u32::from_le_bytes(header[8..12].try_into().unwrap()) as usize;
    let c_vars_len = u32::from_le_bytes(header[12..16].try_into().unwrap()) as usize;
    let body_len = c_reg_len + c_ids_len + c_vars_len;

    let mut buf = header;
    buf.resize(HEADER_LEN + body_len, 0);
    reader.read_exact(&mut buf[HEADER_LEN..]).with_context(|| {
        format!("truncated body at chunk {chunk_idx} (expected {body_len} bytes)")
    })?;

    let (frame, consumed) = Frame::parse(&buf)?;
    debug_assert_eq!(consumed, buf.len());
    Ok(Some(frame))
}
