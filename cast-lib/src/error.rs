//! Error types for the CAST engine.

use thiserror::Error;

/// Fatal failures of the CAST engine.
///
/// Passthrough is deliberately *not* a variant here: falling back to an
/// opaque compressed copy of the input is a successful outcome (see
/// [`crate::Outcome`]), not an error. Only conditions that cannot be
/// recovered from within a block reach this type.
#[derive(Error, Debug)]
pub enum CastError {
    /// The archive ended in the middle of a 17-byte block header, or a
    /// block's body was shorter than its header claimed.
    #[error("truncated archive: {0}")]
    Truncated(String),

    /// A flag byte did not decode to one of the defined mode codes.
    #[error("unknown flag byte: {0:#04x}")]
    UnknownFlag(u8),

    /// CRC32 of the reconstructed plaintext did not match the value stored
    /// in the block header.
    #[error("CRC mismatch: expected {expected:#010x}, got {actual:#010x}")]
    Crc { expected: u32, actual: u32 },

    /// Both codec backends failed (the external helper, if any, and the
    /// in-process fallback).
    #[error("codec error: {0}")]
    Codec(String),

    /// A registry, column, or ID-stream buffer did not decode as valid
    /// UTF-8 where it was required to.
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CastError>;
