//! The LZMA2 codec adapter (`spec.md` §4.6, §9).
//!
//! The rest of the engine only ever sees the [`Codec`] trait; neither the
//! in-process backend nor the external-helper backend leaks into the
//! serializer or decompressor. `FallbackCodec` composes the two as
//! Primary-then-Fallback, with no global state shared between instances.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use xz2::stream::{Check, Filters, LzmaOptions, Stream};
use xz2::write::{XzDecoder, XzEncoder};

use crate::error::CastError;

/// Default LZMA2 dictionary size when the caller doesn't override it.
pub const DEFAULT_DICT_SIZE: u32 = 128 * 1024 * 1024;

/// A total, synchronous compress/decompress pair. Implementations must not
/// alter bytes beyond what the underlying codec does; identical input must
/// yield a byte-identical *decompressed* result regardless of backend, even
/// though the two backends' compressed bitstreams may differ.
pub trait Codec: Send + Sync {
    fn compress(&self, data: &[u8], dict_size: u32) -> Result<Vec<u8>, CastError>;
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CastError>;
}

/// In-process LZMA2 at preset 9 + extreme, CRC32 check inside the xz
/// container, with the dictionary size applied via explicit filters.
#[derive(Debug, Default, Clone, Copy)]
pub struct InProcessLzma2Codec;

const PRESET_9_EXTREME: u32 = 9 | xz2::stream::PRESET_EXTREME;

impl InProcessLzma2Codec {
    fn encoder_stream(dict_size: u32) -> Result<Stream, CastError> {
        let mut opts = LzmaOptions::new_preset(PRESET_9_EXTREME)
            .map_err(|e| CastError::Codec(format!("lzma options: {e}")))?;
        opts.dict_size(dict_size);
        let mut filters = Filters::new();
        filters.lzma2(&opts);
        Stream::new_stream_encoder(&filters, Check::Crc32)
            .map_err(|e| CastError::Codec(format!("lzma encoder: {e}")))
    }
}

impl Codec for InProcessLzma2Codec {
    fn compress(&self, data: &[u8], dict_size: u32) -> Result<Vec<u8>, CastError> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let stream = Self::encoder_stream(dict_size)?;
        let mut encoder = XzEncoder::new_stream(Vec::new(), stream);
        encoder
            .write_all(data)
            .map_err(|e| CastError::Codec(format!("lzma write: {e}")))?;
        encoder
            .finish()
            .map_err(|e| CastError::Codec(format!("lzma finish: {e}")))
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CastError> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let mut decoder = XzDecoder::new(Vec::new());
        decoder
            .write_all(data)
            .map_err(|e| CastError::Codec(format!("lzma read: {e}")))?;
        decoder
            .finish()
            .map_err(|e| CastError::Codec(format!("lzma finish: {e}")))
    }
}

/// Spawns a `7z`-compatible helper binary for the xz container encode/decode
/// argument vectors specified in `spec.md` §4.6.
pub struct ExternalHelperCodec {
    binary: PathBuf,
}

impl ExternalHelperCodec {
    /// Resolves the helper from `SEVEN_ZIP_PATH`, then `7z`, then `7za` on
    /// `PATH`. Returns `None` if nothing resolves, so callers don't attempt
    /// a `Command::spawn` that is guaranteed to fail.
    pub fn discover() -> Option<Self> {
        if let Ok(path) = std::env::var("SEVEN_ZIP_PATH") {
            let candidate = PathBuf::from(&path);
            if candidate.is_file() {
                return Some(Self { binary: candidate });
            }
        }
        which("7z").or_else(|| which("7za")).map(|binary| Self { binary })
    }

    fn run(&self, args: &[&str], input: &[u8]) -> Result<Vec<u8>, CastError> {
        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| CastError::Codec(format!("failed to spawn {}: {e}", self.binary.display())))?;

        let mut child_stdin = child
            .stdin
            .take()
            .ok_or_else(|| CastError::Codec("helper stdin unavailable".into()))?;
        let input_owned = input.to_vec();
        let writer = std::thread::spawn(move || {
            let _ = child_stdin.write_all(&input_owned);
            // child_stdin is dropped here, closing the pipe so the child sees EOF.
        });

        let output = child
            .wait_with_output()
            .map_err(|e| CastError::Codec(format!("failed to wait for helper: {e}")))?;
        let _ = writer.join();

        if !output.status.success() {
            return Err(CastError::Codec(format!(
                "helper exited with status {}",
                output.status
            )));
        }
        if output.stdout.is_empty() && !input.is_empty() {
            return Err(CastError::Codec("helper produced empty output".into()));
        }
        Ok(output.stdout)
    }
}

impl Codec for ExternalHelperCodec {
    fn compress(&self, data: &[u8], dict_size: u32) -> Result<Vec<u8>, CastError> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        let dict_arg = format!("-m0=lzma2:d{dict_size}b");
        self.run(
            &["a", "-txz", "-mx=9", "-mmt=on", &dict_arg, "-y", "-bb0", "-si", "-so", "-an"],
            data,
        )
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CastError> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        self.run(&["e", "-txz", "-si", "-so"], data)
    }
}

/// Primary-then-fallback composition: tries the external helper (if one was
/// discovered), falls back to the in-process codec on any failure.
///
/// `spec.md` §4.9: "Codec errors in the external helper fall back to the
/// in-process codec" — this is the only place that recovery happens; it is
/// invisible on the wire (the compressed bytes alone don't say which
/// backend produced them).
pub struct FallbackCodec {
    helper: Option<ExternalHelperCodec>,
    fallback: InProcessLzma2Codec,
}

impl FallbackCodec {
    pub fn new() -> Self {
        Self {
            helper: ExternalHelperCodec::discover(),
            fallback: InProcessLzma2Codec,
        }
    }

    /// Builds an adapter that never attempts to spawn a helper, useful for
    /// tests and for callers who want a guaranteed-deterministic backend.
    pub fn in_process_only() -> Self {
        Self {
            helper: None,
            fallback: InProcessLzma2Codec,
        }
    }
}

impl Default for FallbackCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Codec for FallbackCodec {
    fn compress(&self, data: &[u8], dict_size: u32) -> Result<Vec<u8>, CastError> {
        if let Some(helper) = &self.helper {
            match helper.compress(data, dict_size) {
                Ok(out) => return Ok(out),
                Err(e) => {
                    tracing::warn!(error = %e, "external LZMA helper failed, falling back to in-process codec");
                }
            }
        }
        self.fallback.compress(data, dict_size)
    }

    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CastError> {
        if let Some(helper) = &self.helper {
            match helper.decompress(data) {
                Ok(out) => return Ok(out),
                Err(e) => {
                    tracing::warn!(error = %e, "external LZMA helper failed, falling back to in-process codec");
                }
            }
        }
        self.fallback.decompress(data)
    }
}

/// Minimal `which(1)`-equivalent lookup over `PATH`, avoiding a dependency
/// for a two-directory-scan helper.
fn which(name: &str) -> Option<PathBuf> {
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var).find_map(|dir| {
        let candidate = dir.join(name);
        is_executable(&candidate).then_some(candidate)
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}
