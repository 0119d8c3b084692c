//! The decompressor state machine (`spec.md` §4.8): Entry → Decode → Parse
//! registry → Parse IDs → Parse variables → Bind columns to templates →
//! Reassemble → Latin-1 restore → Verify.

use crate::codec::Codec;
use crate::error::CastError;
use crate::flag::IdWidth;
use crate::framer::{crc32, Frame};
use crate::sentinel::{PH, RS};

/// Decompresses one [`Frame`] back to the original plaintext bytes.
pub fn decompress_block(frame: &Frame, codec: &dyn Codec) -> Result<Vec<u8>, CastError> {
    if frame.flag.width == IdWidth::Passthrough {
        let data = codec.decompress(&frame.c_vars)?;
        return verify_crc(data, frame.crc32);
    }

    let is_unified = frame.c_reg.is_empty() && frame.c_ids.is_empty();

    let (reg_bytes, ids_bytes, vars_bytes) = if is_unified {
        let full = codec.decompress(&frame.c_vars)?;
        if full.len() < 8 {
            return Err(CastError::Truncated(
                "UNIFIED payload shorter than its 8-byte internal header".into(),
            ));
        }
        let len_reg = u32::from_le_bytes(full[0..4].try_into().unwrap()) as usize;
        let len_ids = u32::from_le_bytes(full[4..8].try_into().unwrap()) as usize;
        let mut offset = 8;
        let reg = full
            .get(offset..offset + len_reg)
            .ok_or_else(|| CastError::Truncated("UNIFIED registry segment truncated".into()))?
            .to_vec();
        offset += len_reg;

        let ids = if frame.flag.width == IdWidth::Single {
            Vec::new()
        } else {
            let ids = full
                .get(offset..offset + len_ids)
                .ok_or_else(|| CastError::Truncated("UNIFIED id-stream segment truncated".into()))?
                .to_vec();
            offset += len_ids;
            ids
        };
        let vars = full[offset..].to_vec();
        (reg, ids, vars)
    } else {
        let reg = codec.decompress(&frame.c_reg)?;
        let ids = if frame.flag.width == IdWidth::Single {
            Vec::new()
        } else {
            codec.decompress(&frame.c_ids)?
        };
        let vars = codec.decompress(&frame.c_vars)?;
        (reg, ids, vars)
    };

    let registry_text =
        String::from_utf8(reg_bytes).map_err(|_| CastError::InvalidUtf8("registry"))?;
    // An empty registry means zero templates. `"".split(RS)` would otherwise
    // report one (phantom, empty) skeleton instead of none.
    let skeletons: Vec<&str> = if registry_text.is_empty() {
        Vec::new()
    } else {
        registry_text.split(RS).collect()
    };

    let template_ids = parse_ids(&ids_bytes, frame.flag.width);

    let raw_columns = if is_unified {
        parse_variables_unified(&vars_bytes)
    } else {
        parse_variables_split(&vars_bytes)
    };

    let mut cursor = 0usize;
    let mut templates: Vec<TemplateView> = Vec::with_capacity(skeletons.len());
    for skeleton in &skeletons {
        let parts: Vec<&str> = skeleton.split(PH).collect();
        let num_columns = parts.len() - 1;
        let columns = raw_columns
            .get(cursor..cursor + num_columns)
            .unwrap_or(&[])
            .to_vec();
        cursor += num_columns;
        templates.push(TemplateView { parts, columns, row_cursor: 0 });
    }

    let mut out = Vec::new();
    if frame.flag.width == IdWidth::Single {
        if let Some(template) = templates.first() {
            reassemble_all_rows(template, &mut out);
        }
    } else {
        for &id in &template_ids {
            let template = templates
                .get_mut(id as usize)
                .ok_or_else(|| CastError::Truncated(format!("template id {id} has no registry entry")))?;
            if !reassemble_one_row(template, &mut out) {
                break;
            }
        }
    }

    let restored = match (frame.flag.is_latin1, String::from_utf8(out.clone())) {
        (true, Ok(text)) => match crate::classify::encode_latin1(&text) {
            Some(bytes) => bytes,
            None => {
                tracing::warn!("Latin-1 restoration failed (value above U+00FF); emitting UTF-8 bytes as-is");
                out
            }
        },
        (true, Err(_)) => {
            tracing::warn!("Latin-1 restoration failed (reconstructed bytes are not valid UTF-8); emitting bytes as-is");
            out
        }
        (false, _) => out,
    };

    verify_crc(restored, frame.crc32)
}

fn verify_crc(data: Vec<u8>, expected: u32) -> Result<Vec<u8>, CastError> {
    let actual = crc32(&data);
    if actual != expected {
        return Err(CastError::Crc { expected, actual });
    }
    Ok(data)
}

struct TemplateView<'a> {
    /// The skeleton's literal segments, `split(PH)` — length is
    /// `num_columns + 1`.
    parts: Vec<&'a str>,
    /// One entry per placeholder; each holds every captured value for that
    /// column, in row order.
    columns: Vec<Vec<Vec<u8>>>,
    row_cursor: usize,
}

/// Splices one row of `template` (its static parts interleaved with the
/// next value of each column) onto `out`. Returns `false` if any column is
/// already exhausted (the stream and the columns disagree in length,
/// signaling a malformed or adversarially truncated archive).
fn reassemble_one_row(template: &mut TemplateView, out: &mut Vec<u8>) -> bool {
    if template.columns.iter().any(|c| template.row_cursor >= c.len()) {
        return false;
    }
    for (i, part) in template.parts.iter().enumerate() {
        out.extend_from_slice(part.as_bytes());
        if i < template.columns.len() {
            out.extend_from_slice(&template.columns[i][template.row_cursor]);
        }
    }
    template.row_cursor += 1;
    true
}

/// Used only for the single-template (`flag == 3`) case, where there is no
/// ID stream to drive iteration: every row is emitted back to back until a
/// column runs dry.
fn reassemble_all_rows(template: &TemplateView, out: &mut Vec<u8>) {
    let mut cursor = 0usize;
    loop {
        if template.columns.is_empty() || template.columns.iter().any(|c| cursor >= c.len()) {
            break;
        }
        for (i, part) in template.parts.iter().enumerate() {
            out.extend_from_slice(part.as_bytes());
            if i < template.columns.len() {
                out.extend_from_slice(&template.columns[i][cursor]);
            }
        }
        cursor += 1;
    }
}

fn parse_ids(bytes: &[u8], width: IdWidth) -> Vec<u32> {
    match width {
        IdWidth::Single | IdWidth::Passthrough => Vec::new(),
        IdWidth::U8 => bytes.iter().map(|&b| b as u32).collect(),
        IdWidth::U16 => bytes
            .chunks_exact(2)
            .map(|c| u16::from_le_bytes([c[0], c[1]]) as u32)
            .collect(),
        IdWidth::U32 => bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    }
}

const ESC: u8 = 0x01;
const ROW_SEP: u8 = 0x00;
const COL_SEP_UNIFIED: u8 = 0x02;

/// Parses the UNIFIED Always-Escaped variables buffer into one
/// `Vec<Vec<u8>>` per column, in registry/column order.
///
/// A raw `0x00` outside an escape prefix always marks a row boundary; a raw
/// `0x02` outside an escape prefix always marks a column boundary. Because
/// columns are detected as they are closed (rather than via a
/// split-then-drop-the-last-empty-element approach), the "drop exactly one
/// trailing empty element" rule from `spec.md` §9 falls out naturally: the
/// scan simply stops after the final `0x02` with nothing left to append.
fn parse_variables_unified(bytes: &[u8]) -> Vec<Vec<Vec<u8>>> {
    let mut columns = Vec::new();
    let mut current_column: Vec<Vec<u8>> = Vec::new();
    let mut current_cell = Vec::new();
    let mut escaping = false;

    for &b in bytes {
        if escaping {
            match b {
                0x01 => current_cell.push(ESC),
                0x00 => current_cell.push(ROW_SEP),
                0x03 => current_cell.push(COL_SEP_UNIFIED),
                other => current_cell.push(other),
            }
            escaping = false;
            continue;
        }

        match b {
            ESC => escaping = true,
            ROW_SEP => {
                current_column.push(std::mem::take(&mut current_cell));
            }
            COL_SEP_UNIFIED => {
                current_column.push(std::mem::take(&mut current_cell));
                columns.push(std::mem::take(&mut current_column));
            }
            other => current_cell.push(other),
        }
    }

    columns
}

/// Parses the SPLIT (unescaped) variables buffer: columns are terminated
/// by the two-byte sentinel `0xFF 0xFF`, rows within a column by a raw
/// `0x00`.
fn parse_variables_split(bytes: &[u8]) -> Vec<Vec<Vec<u8>>> {
    let mut columns = Vec::new();
    let mut i = 0usize;
    let mut column_start = 0usize;

    while i < bytes.len() {
        if bytes[i] == 0xFF && bytes.get(i + 1) == Some(&0xFF) {
            let chunk = &bytes[column_start..i];
            columns.push(chunk.split(|&b| b == ROW_SEP).map(|s| s.to_vec()).collect());
            i += 2;
            column_start = i;
        } else {
            i += 1;
        }
    }

    columns
}
