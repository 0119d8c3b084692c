//! CAST — Columnar Agnostic Structural Transformation.
//!
//! A lossless preprocessing layer for structured text: each line is split
//! into a literal *skeleton* and an ordered list of masked-out *variables*,
//! the variables are stored column-major per skeleton, and the three
//! resulting streams (skeleton registry, per-line template-ID stream,
//! variable columns) are handed to LZMA2 instead of the raw bytes. Inputs
//! that don't look like structured text — binaries, undecodable byte
//! sequences, content already containing the reserved sentinel codepoints,
//! or content with too little line-to-line repetition to be worth
//! templating — fall back to an opaque compressed copy via passthrough.
//!
//! The engine operates one block at a time; nothing here is shared state
//! across blocks, so embedders are free to process independent blocks
//! concurrently (see [`codec::Codec`]'s `Send` bound) even though the CLI
//! driver in `cast-cmd` processes its chunks sequentially.

pub mod classify;
pub mod codec;
mod compressor;
pub mod dictionary;
mod decompressor;
pub mod error;
pub mod flag;
pub mod framer;
mod lines;
pub mod optimizer;
mod sentinel;
pub mod serializer;
pub mod tokenizer;

pub use classify::PassthroughReason;
pub use codec::{Codec, DEFAULT_DICT_SIZE};
pub use compressor::{compress_block, CompressOptions, Outcome};
pub use decompressor::decompress_block;
pub use error::{CastError, Result};
pub use flag::{IdWidth, ModeFlag};
pub use framer::{Frame, HEADER_LEN};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FallbackCodec;

    #[test]
    fn public_api_round_trips_a_mixed_block() {
        let codec = FallbackCodec::in_process_only();
        let data = b"user=alice id=1\nuser=bob id=2\nuser=carol id=3\n".repeat(20);
        let outcome = compress_block(&data, &codec, &CompressOptions::default()).unwrap();
        let frame = outcome.into_frame();
        let archive = frame.to_bytes();

        let (parsed, consumed) = Frame::parse(&archive).unwrap();
        assert_eq!(consumed, archive.len());
        let restored = decompress_block(&parsed, &codec).unwrap();
        assert_eq!(restored, data);
    }
}
