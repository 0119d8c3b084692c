//! Serializes a (possibly remapped) template dictionary into the three wire
//! buffers: registry, ID stream, and variables (`spec.md` §4.5).

use crate::dictionary::TemplateDictionary;
use crate::flag::IdWidth;
use crate::optimizer::Layout;
use crate::sentinel::RS;

/// Raw (pre-compression) bytes for one block's three parts.
pub struct RawBuffers {
    pub registry: Vec<u8>,
    pub ids: Vec<u8>,
    pub variables: Vec<u8>,
}

/// Joins every template's skeleton with [`RS`] and UTF-8 encodes the
/// result.
pub fn build_registry(dict: &TemplateDictionary) -> Vec<u8> {
    let joined = dict
        .templates
        .iter()
        .map(|t| t.skeleton.as_str())
        .collect::<Vec<_>>()
        .join(&RS.to_string());
    joined.into_bytes()
}

/// Packs the (already-remapped, if UNIFIED) template-ID stream at the
/// width implied by `width`. Elided entirely for [`IdWidth::Single`].
pub fn build_id_stream(stream: &[u32], width: IdWidth) -> Vec<u8> {
    match width {
        IdWidth::Single | IdWidth::Passthrough => Vec::new(),
        IdWidth::U8 => stream.iter().map(|&id| id as u8).collect(),
        IdWidth::U16 => {
            let mut out = Vec::with_capacity(stream.len() * 2);
            for &id in stream {
                out.extend_from_slice(&(id as u16).to_le_bytes());
            }
            out
        }
        IdWidth::U32 => {
            let mut out = Vec::with_capacity(stream.len() * 4);
            for &id in stream {
                out.extend_from_slice(&id.to_le_bytes());
            }
            out
        }
    }
}

const ESC: u8 = 0x01;
const ROW_SEP: u8 = 0x00;
const COL_SEP_UNIFIED: u8 = 0x02;
const COL_SEP_SPLIT: [u8; 2] = [0xFF, 0xFF];

/// Escapes a single variable value for the UNIFIED Always-Escaped layout
/// (`spec.md` §4.5 table): `0x01→0x01 0x01`, `0x00→0x01 0x00`,
/// `0x02→0x01 0x03`.
fn escape_value(value: &str, out: &mut Vec<u8>) {
    for &b in value.as_bytes() {
        match b {
            ESC => out.extend_from_slice(&[ESC, 0x01]),
            ROW_SEP => out.extend_from_slice(&[ESC, 0x00]),
            COL_SEP_UNIFIED => out.extend_from_slice(&[ESC, 0x03]),
            other => out.push(other),
        }
    }
}

/// Builds the variables buffer for `dict` under `layout`.
///
/// UNIFIED: every column's values are escaped and `0x00`-joined, with each
/// column terminated by a single `0x02` (including the very last column of
/// the very last template — the decoder drops exactly one resulting
/// trailing empty element, per `spec.md` §9).
///
/// SPLIT: values are emitted verbatim (no escaping), `0x00`-joined, with
/// each column terminated by the two-byte sentinel `0xFF 0xFF`.
pub fn build_variables(dict: &TemplateDictionary, layout: Layout) -> Vec<u8> {
    let mut out = Vec::new();
    for template in &dict.templates {
        for column in &template.columns {
            for (i, value) in column.iter().enumerate() {
                if i > 0 {
                    out.push(ROW_SEP);
                }
                match layout {
                    Layout::Unified => escape_value(value, &mut out),
                    Layout::Split => out.extend_from_slice(value.as_bytes()),
                }
            }
            match layout {
                Layout::Unified => out.push(COL_SEP_UNIFIED),
                Layout::Split => out.extend_from_slice(&COL_SEP_SPLIT),
            }
        }
    }
    out
}

/// Builds all three raw buffers for `dict` at `layout`, packing the ID
/// stream at `width` (see [`TemplateDictionary::effective_id_width`] for why
/// this isn't always just `IdWidth::for_template_count`).
pub fn serialize(dict: &TemplateDictionary, layout: Layout, width: IdWidth) -> RawBuffers {
    RawBuffers {
        registry: build_registry(dict),
        ids: build_id_stream(&dict.stream, width),
        variables: build_variables(dict, layout),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::extract;
    use crate::tokenizer::Strategy;

    #[test]
    fn registry_joins_skeletons_with_rs() {
        let dict = extract("a=1\nb=2\n", Strategy::Strict).unwrap();
        let reg = build_registry(&dict);
        let text = String::from_utf8(reg).unwrap();
        assert_eq!(text.matches(RS).count(), dict.num_templates() - 1);
    }

    #[test]
    fn escaping_round_trips_reserved_bytes() {
        let mut out = Vec::new();
        escape_value("a\u{0}b\u{1}c", &mut out);
        // \u0 -> 0x00 escapes by UTF-8 encoding to a literal NUL byte that
        // must be escaped to 0x01 0x00.
        assert!(out.windows(2).any(|w| w == [ESC, 0x00]));
        assert!(out.windows(2).any(|w| w == [ESC, 0x01]));
    }

    #[test]
    fn unified_escapes_raw_0x02_byte() {
        let mut out = Vec::new();
        escape_value("col,\u{2},val", &mut out);
        assert!(out.windows(2).any(|w| w == [ESC, 0x03]));
        assert!(!out.contains(&COL_SEP_UNIFIED));
    }

    #[test]
    fn single_template_elides_id_stream() {
        let dict = extract("a=1\na=2\n", Strategy::Strict).unwrap();
        let width = IdWidth::for_template_count(dict.num_templates());
        assert_eq!(width, IdWidth::Single);
        assert!(build_id_stream(&dict.stream, width).is_empty());
    }

    #[test]
    fn id_stream_width_selection() {
        assert_eq!(IdWidth::for_template_count(1), IdWidth::Single);
        assert_eq!(IdWidth::for_template_count(2), IdWidth::U8);
        assert_eq!(IdWidth::for_template_count(255), IdWidth::U8);
        assert_eq!(IdWidth::for_template_count(256), IdWidth::U16);
        assert_eq!(IdWidth::for_template_count(65535), IdWidth::U16);
        assert_eq!(IdWidth::for_template_count(65536), IdWidth::U32);
    }
}
