//! Chooses between the SPLIT and UNIFIED container layouts and applies the
//! frequency remap for UNIFIED blocks (`spec.md` §4.4).

use std::io::Write;

use flate2::write::DeflateEncoder;
use flate2::Compression;

use crate::dictionary::TemplateDictionary;

/// The two on-wire container layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Registry, ID stream, and variables buffer are three independent
    /// LZMA streams; unescaped variables, `0xFF 0xFF` column terminator.
    Split,
    /// The three parts are concatenated behind an 8-byte internal header
    /// and compressed as one LZMA stream; Always-Escaped variables buffer.
    Unified,
}

const TEMPLATE_COUNT_FORCE_UNIFIED: usize = 256;
const SAMPLE_TEMPLATE_LIMIT: usize = 5;
const SAMPLE_VALUES_PER_COLUMN: usize = 50;
const SAMPLE_BYTE_BUDGET: usize = 2000;
/// Below this compressed-ratio threshold on the cheap DEFLATE sample, the
/// variable content is judged mostly-ASCII/low-entropy enough for the
/// unescaped SPLIT layout to be safe.
const SPLIT_RATIO_THRESHOLD: f64 = 3.0;

/// Decides SPLIT vs UNIFIED for `dict` (`spec.md` §4.4 step 1-3).
pub fn choose_layout(dict: &TemplateDictionary) -> Layout {
    if dict.num_templates() >= TEMPLATE_COUNT_FORCE_UNIFIED {
        return Layout::Unified;
    }

    let mut sample = Vec::new();
    let mut count = 0usize;
    'templates: for template in dict.templates.iter().take(SAMPLE_TEMPLATE_LIMIT) {
        for column in &template.columns {
            for value in column.iter().take(SAMPLE_VALUES_PER_COLUMN) {
                sample.extend_from_slice(value.as_bytes());
                count += 1;
            }
            if count > SAMPLE_BYTE_BUDGET {
                break 'templates;
            }
        }
    }

    if sample.is_empty() {
        return Layout::Unified;
    }

    let compressed_len = deflate_sample(&sample);
    if compressed_len == 0 {
        return Layout::Unified;
    }

    let ratio = sample.len() as f64 / compressed_len as f64;
    if ratio < SPLIT_RATIO_THRESHOLD {
        Layout::Split
    } else {
        Layout::Unified
    }
}

/// Cheap DEFLATE-level-1 compression used purely to estimate how
/// compressible the variable content already is; never touches the wire
/// format (that is LZMA2's job, via [`crate::codec`]).
fn deflate_sample(sample: &[u8]) -> usize {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::new(1));
    if encoder.write_all(sample).is_err() {
        return 0;
    }
    encoder.finish().map(|buf| buf.len()).unwrap_or(0)
}

/// Rewrites `dict` in place so template ids are ordered by descending
/// frequency in the stream (id 0 is the most frequent template),
/// rebuilding `templates`, and `stream` together so the invariant "index i
/// of each array corresponds to template id i" is preserved.
pub fn remap_by_frequency(dict: &mut TemplateDictionary) {
    let mut counts = vec![0u32; dict.templates.len()];
    for &id in &dict.stream {
        counts[id as usize] += 1;
    }

    let mut order: Vec<u32> = (0..dict.templates.len() as u32).collect();
    // Stable sort descending by count; ties keep original (insertion) order,
    // matching Python's stable `Counter.most_common()`.
    order.sort_by(|&a, &b| counts[b as usize].cmp(&counts[a as usize]));

    let mut remap = vec![0u32; dict.templates.len()];
    for (new_id, &old_id) in order.iter().enumerate() {
        remap[old_id as usize] = new_id as u32;
    }

    let old_templates = std::mem::take(&mut dict.templates);
    let mut new_templates: Vec<Option<crate::dictionary::TemplateEntry>> =
        old_templates.into_iter().map(Some).collect();

    let mut rebuilt = Vec::with_capacity(new_templates.len());
    for _ in 0..new_templates.len() {
        rebuilt.push(None);
    }
    for (old_id, slot) in new_templates.iter_mut().enumerate() {
        let new_id = remap[old_id] as usize;
        rebuilt[new_id] = slot.take();
    }
    dict.templates = rebuilt.into_iter().map(|t| t.expect("every new id filled")).collect();

    for id in dict.stream.iter_mut() {
        *id = remap[*id as usize];
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokenizer::Strategy;

    #[test]
    fn remap_orders_by_descending_frequency() {
        let mut dict = crate::dictionary::extract(
            "rare\ncommon\ncommon\ncommon\nrare\n",
            Strategy::Aggressive,
        )
        .unwrap();
        let old_skeletons: Vec<String> =
            dict.templates.iter().map(|t| t.skeleton.clone()).collect();
        let common_old_id = dict.stream[1];

        remap_by_frequency(&mut dict);

        assert_eq!(dict.templates[0].skeleton, old_skeletons[common_old_id as usize]);

        let mut counts = std::collections::HashMap::new();
        for &id in &dict.stream {
            *counts.entry(id).or_insert(0u32) += 1;
        }
        let mut ids: Vec<u32> = counts.keys().copied().collect();
        ids.sort();
        for window in ids.windows(2) {
            assert!(counts[&window[0]] >= counts[&window[1]]);
        }
    }

    #[test]
    fn many_templates_force_unified() {
        let mut text = String::new();
        for i in 0..300 {
            text.push_str(&format!("tag_{i} const\n"));
        }
        let dict = crate::dictionary::extract(&text, Strategy::Aggressive).unwrap();
        assert!(dict.num_templates() >= TEMPLATE_COUNT_FORCE_UNIFIED);
        assert_eq!(choose_layout(&dict), Layout::Unified);
    }

    #[test]
    fn single_repetitive_template_chooses_split() {
        let dict = crate::dictionary::extract("a=1\na=2\na=3\na=4\na=5\n", Strategy::Strict).unwrap();
        assert_eq!(choose_layout(&dict), Layout::Split);
    }
}
