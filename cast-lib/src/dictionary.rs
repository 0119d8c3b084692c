//! Template dictionary and entropy guard (`spec.md` §3, §4.3).

use std::collections::HashMap;

use crate::classify::PassthroughReason;
use crate::flag::IdWidth;
use crate::tokenizer::{mask_line, Strategy};

/// One skeleton and the column-major variable storage for every line that
/// matched it.
#[derive(Debug, Clone)]
pub struct TemplateEntry {
    pub skeleton: String,
    /// `columns[i]` holds every value captured for placeholder `i`, in the
    /// order lines were seen.
    pub columns: Vec<Vec<String>>,
}

impl TemplateEntry {
    fn new(skeleton: String, num_columns: usize) -> Self {
        Self {
            skeleton,
            columns: vec![Vec::new(); num_columns],
        }
    }
}

/// Built once per block: maps skeleton text to template id, stores each
/// template's columns, and records the per-line template-id stream.
///
/// Never shared or reused across blocks (`spec.md` §3/§5) — constructed
/// fresh by [`extract`] and dropped once the caller is done with it.
#[derive(Debug, Default)]
pub struct TemplateDictionary {
    by_skeleton: HashMap<String, u32>,
    pub templates: Vec<TemplateEntry>,
    pub stream: Vec<u32>,
}

impl TemplateDictionary {
    fn new() -> Self {
        Self::default()
    }

    fn register_or_get(&mut self, skeleton: &str, num_columns: usize) -> Option<u32> {
        if let Some(&id) = self.by_skeleton.get(skeleton) {
            return Some(id);
        }
        let id = self.templates.len() as u32;
        self.by_skeleton.insert(skeleton.to_string(), id);
        self.templates.push(TemplateEntry::new(skeleton.to_string(), num_columns));
        Some(id)
    }

    pub fn num_templates(&self) -> usize {
        self.templates.len()
    }

    /// The ID-stream width that should actually be persisted.
    ///
    /// [`IdWidth::for_template_count`] alone would elide the stream whenever
    /// there is exactly one template, on the assumption that row count is
    /// recoverable by zipping the template's columns back together at
    /// decode time. That assumption fails when the lone template has zero
    /// columns (every line matched it with no captured variables at all,
    /// e.g. a run of identical separator lines) — there would be nothing
    /// left to zip, and the row count would be lost. In that one case the
    /// stream is kept at the minimum non-elided width instead.
    pub fn effective_id_width(&self) -> IdWidth {
        let width = IdWidth::for_template_count(self.num_templates());
        if width == IdWidth::Single && self.templates.first().is_some_and(|t| t.columns.is_empty()) {
            return IdWidth::U8;
        }
        width
    }
}

/// Extracts a template dictionary from `text` using `strategy`.
///
/// Empty lines (after `splitlines(keepends=True)`) are skipped entirely, as
/// specified. Returns `Err(reason)` the moment a passthrough trigger fires
/// (a sentinel collision or the entropy guard), matching the reference
/// implementation's early-exit behavior — everything extracted so far is
/// discarded in that case, since the whole block falls back to opaque
/// compression.
pub fn extract(text: &str, strategy: Strategy) -> Result<TemplateDictionary, PassthroughReason> {
    let lines = crate::lines::split_keepends(text);
    let num_lines = lines.len();
    let unique_limit = num_lines as f64 * strategy.unique_limit_factor();

    let mut dict = TemplateDictionary::new();

    for line in &lines {
        if line.is_empty() {
            continue;
        }

        let masked = mask_line(line, strategy).ok_or(PassthroughReason::Collision)?;

        let id = match dict.by_skeleton.get(&masked.skeleton) {
            Some(&id) => id,
            None => {
                if dict.templates.len() as f64 > unique_limit {
                    return Err(PassthroughReason::Entropy);
                }
                dict.register_or_get(&masked.skeleton, masked.variables.len())
                    .expect("freshly registered skeleton is always present")
            }
        };

        dict.stream.push(id);
        let columns = &mut dict.templates[id as usize].columns;
        let limit = masked.variables.len().min(columns.len());
        for (col, value) in columns.iter_mut().zip(masked.variables.into_iter()).take(limit) {
            col.push(value);
        }
    }

    Ok(dict)
}
