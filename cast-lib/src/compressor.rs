//! The compressor pipeline: Classify → Tokenize → Extract → Choose layout
//! → Serialize → Codec → Frame (`spec.md` §4.1-§4.7).

use crate::classify::{self, PassthroughReason};
use crate::codec::{Codec, DEFAULT_DICT_SIZE};
use crate::dictionary;
use crate::error::CastError;
use crate::flag::{IdWidth, ModeFlag};
use crate::framer::{crc32, Frame};
use crate::optimizer::{self, Layout};
use crate::serializer;
use crate::tokenizer;

/// Tuning knobs for [`compress_block`]. `dict_size` is forwarded to the
/// codec unchanged; it has no effect on the block's semantics, only on how
/// hard LZMA2 is allowed to look back.
pub struct CompressOptions {
    pub dict_size: u32,
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self { dict_size: DEFAULT_DICT_SIZE }
    }
}

/// The result of compressing one block: either it went through the full
/// templating pipeline, or it fell back to an opaque compressed copy of the
/// original bytes. Passthrough is a successful outcome, not an error —
/// `spec.md` §4.9 is explicit that none of its triggers are failures.
pub enum Outcome {
    Encoded(Frame),
    Passthrough { frame: Frame, reason: PassthroughReason },
}

impl Outcome {
    pub fn frame(&self) -> &Frame {
        match self {
            Outcome::Encoded(frame) => frame,
            Outcome::Passthrough { frame, .. } => frame,
        }
    }

    pub fn into_frame(self) -> Frame {
        match self {
            Outcome::Encoded(frame) => frame,
            Outcome::Passthrough { frame, .. } => frame,
        }
    }
}

/// Runs the full compression pipeline over one block of plaintext.
///
/// Every passthrough path compresses `data` itself — the original raw
/// bytes, never a decoded-and-re-encoded stand-in — so that
/// `decompress(compress(data)) == data` holds unconditionally, including
/// for a Latin-1 block that trips the entropy guard after decoding (the
/// reference implementation re-encodes its already-decoded text as UTF-8 in
/// that one path, which does not round-trip for genuinely Latin-1 input;
/// the fundamental round-trip property in `spec.md` §8 takes precedence
/// over reproducing that edge case).
pub fn compress_block(
    data: &[u8],
    codec: &dyn Codec,
    options: &CompressOptions,
) -> Result<Outcome, CastError> {
    if classify::looks_binary(data) {
        return passthrough(data, PassthroughReason::Binary, codec, options.dict_size);
    }

    let decoded = match classify::decode_text(data) {
        Some(decoded) => decoded,
        None => return passthrough(data, PassthroughReason::DecodeFail, codec, options.dict_size),
    };

    let strategy = tokenizer::select_strategy(&decoded.text);
    let mut dict = match dictionary::extract(&decoded.text, strategy) {
        Ok(dict) => dict,
        Err(reason) => return passthrough(data, reason, codec, options.dict_size),
    };

    let layout = optimizer::choose_layout(&dict);
    if layout == Layout::Unified {
        optimizer::remap_by_frequency(&mut dict);
    }

    let width = dict.effective_id_width();
    let raw = serializer::serialize(&dict, layout, width);
    let flag = ModeFlag::new(width, decoded.is_latin1);

    let (c_reg, c_ids, c_vars) = match layout {
        Layout::Split => (
            codec.compress(&raw.registry, options.dict_size)?,
            codec.compress(&raw.ids, options.dict_size)?,
            codec.compress(&raw.variables, options.dict_size)?,
        ),
        Layout::Unified => {
            let mut solid = Vec::with_capacity(8 + raw.registry.len() + raw.ids.len() + raw.variables.len());
            solid.extend_from_slice(&(raw.registry.len() as u32).to_le_bytes());
            solid.extend_from_slice(&(raw.ids.len() as u32).to_le_bytes());
            solid.extend_from_slice(&raw.registry);
            solid.extend_from_slice(&raw.ids);
            solid.extend_from_slice(&raw.variables);
            (Vec::new(), Vec::new(), codec.compress(&solid, options.dict_size)?)
        }
    };

    tracing::debug!(
        templates = dict.num_templates(),
        layout = ?layout,
        "block encoded via templating pipeline"
    );

    Ok(Outcome::Encoded(Frame { crc32: crc32(data), flag, c_reg, c_ids, c_vars }))
}

fn passthrough(
    data: &[u8],
    reason: PassthroughReason,
    codec: &dyn Codec,
    dict_size: u32,
) -> Result<Outcome, CastError> {
    tracing::debug!(reason = reason.as_str(), "block falling back to passthrough");
    let c_vars = codec.compress(data, dict_size)?;
    let frame = Frame {
        crc32: crc32(data),
        flag: ModeFlag::new(IdWidth::Passthrough, false),
        c_reg: Vec::new(),
        c_ids: Vec::new(),
        c_vars,
    };
    Ok(Outcome::Passthrough { frame, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::FallbackCodec;
    use crate::decompressor::decompress_block;

    fn round_trip(data: &[u8]) -> (Vec<u8>, Outcome) {
        let codec = FallbackCodec::in_process_only();
        let outcome = compress_block(data, &codec, &CompressOptions::default()).unwrap();
        let restored = decompress_block(outcome.frame(), &codec).unwrap();
        (restored, outcome)
    }

    #[test]
    fn single_template_round_trips_with_elided_ids() {
        let data = b"a=1\na=2\na=3\n";
        let (restored, outcome) = round_trip(data);
        assert_eq!(restored, data);
        assert!(matches!(outcome, Outcome::Encoded(_)));
        assert_eq!(outcome.frame().flag.width, IdWidth::Single);
    }

    #[test]
    fn two_templates_round_trip_with_u8_ids() {
        let data = b"GET /x 200\nGET /y 404\nPOST /z 500\nGET /w 200\n";
        let (restored, outcome) = round_trip(data);
        assert_eq!(restored, data);
        assert_eq!(outcome.frame().flag.width, IdWidth::U8);
    }

    #[test]
    fn embedded_unified_separator_byte_round_trips() {
        let data = b"tag_a val=\x02weird\ntag_b val=normal\ntag_c val=another\n".repeat(40);
        let (restored, _) = round_trip(&data);
        assert_eq!(restored, data);
    }

    #[test]
    fn binary_blob_falls_back_to_passthrough() {
        let data: Vec<u8> = (0u8..=255).cycle().take(5000).collect();
        let (restored, outcome) = round_trip(&data);
        assert_eq!(restored, data);
        assert!(matches!(
            outcome,
            Outcome::Passthrough { reason: PassthroughReason::Binary, .. }
        ));
    }

    #[test]
    fn high_cardinality_text_trips_entropy_guard() {
        let mut text = String::new();
        for i in 0..5000 {
            text.push_str(&format!("distinct-{i}-{}\n", i * 7919));
        }
        let (restored, outcome) = round_trip(text.as_bytes());
        assert_eq!(restored, text.as_bytes());
        assert!(matches!(
            outcome,
            Outcome::Passthrough { reason: PassthroughReason::Entropy, .. }
        ));
    }

    #[test]
    fn latin1_input_round_trips() {
        let mut data = Vec::new();
        for i in 0..30u8 {
            data.extend_from_slice(b"name=\xe9 id=");
            data.push(b'0' + (i % 10));
            data.push(b'\n');
        }
        let (restored, outcome) = round_trip(&data);
        assert_eq!(restored, data);
        assert!(outcome.frame().flag.is_latin1);
    }

    #[test]
    fn repeated_literal_line_with_no_variables_round_trips() {
        // A single template whose skeleton captures no placeholders at all
        // cannot recover its row count by zipping empty columns, so
        // `TemplateDictionary::effective_id_width` must refuse to elide the
        // ID stream here even though there is only one template. 50
        // repetitions keeps the distinct/total ratio at 0.02, well under the
        // 0.10 threshold, so Strict strategy is chosen and "---" (which
        // Strict's decimal/hex/quoted alternation doesn't match) stays an
        // unmasked literal — a genuinely zero-column template. At fewer
        // repetitions Aggressive would be chosen instead, which masks
        // "---" as a one-column variable and never reaches this branch.
        let data = b"---\n".repeat(50);
        let (restored, outcome) = round_trip(&data);
        assert_eq!(restored, data);
        assert_eq!(outcome.frame().flag.width, IdWidth::U8);
    }

    #[test]
    fn empty_input_round_trips() {
        let (restored, _) = round_trip(b"");
        assert!(restored.is_empty());
    }
}
