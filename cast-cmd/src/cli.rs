//! Command-line surface (`spec.md` §6). The subcommand names are the exact
//! `-c` / `-d` / `-v` tokens from the spec's CLI grammar rather than the
//! usual bare-word subcommands, so `cast -c in.log out.cast` matches the
//! documented invocation precisely.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "cast", version, author, about = "CAST: Columnar Agnostic Structural Transformation", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Compress a file.
    #[command(name = "-c")]
    Compress {
        input: PathBuf,
        output: PathBuf,
        /// Splits the input into independently framed blocks of this size
        /// (last block may be shorter). Human-readable: `100MB`, `1GB`.
        #[arg(long)]
        chunk_size: Option<String>,
        /// LZMA2 dictionary size fed to the codec adapter. Default 128MB.
        #[arg(long)]
        dict_size: Option<String>,
        /// Runs a decode-and-compare pass after writing.
        #[arg(short = 'v', long = "verify")]
        verify: bool,
    },
    /// Decompress a full archive.
    #[command(name = "-d")]
    Decompress { input: PathBuf, output: PathBuf },
    /// Verify every block's CRC without writing plaintext.
    #[command(name = "-v")]
    Verify { input: PathBuf },
}
