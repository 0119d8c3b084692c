//! Line tokenizer: masks literal fields out of a line, producing a
//! skeleton and the ordered list of captured variables (`spec.md` §4.2).

use regex::Regex;
use std::sync::LazyLock;

use crate::sentinel::{contains_sentinel, PH};

/// `"(?:[^"\\]|\\.|"")*"` (quoted literal, escape-aware) OR signed decimal
/// (optional fractional part) OR `0x`-prefixed hex. Alternation order is
/// significant — the engine tries each branch left to right at a given
/// position, so this must match `spec.md` §4.2 exactly.
static STRICT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""(?:[^"\\]|\\.|"")*"|-?\d+(?:\.\d+)?|0x[0-9a-fA-F]+"#).unwrap()
});

/// `"(?:[^"\\]|\\.|"")*"` OR a run of `[A-Za-z0-9_.\-]+`.
static AGGRESSIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""(?:[^"\\]|\\.|"")*"|[A-Za-z0-9_.\-]+"#).unwrap());

/// Which alternation is frozen for the remainder of a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Strict,
    Aggressive,
}

impl Strategy {
    fn pattern(self) -> &'static Regex {
        match self {
            Strategy::Strict => &STRICT,
            Strategy::Aggressive => &AGGRESSIVE,
        }
    }

    /// Fraction of the dictionary's capacity that may be spent on distinct
    /// skeletons before the entropy guard trips (`spec.md` §4.3).
    pub fn unique_limit_factor(self) -> f64 {
        match self {
            Strategy::Strict => 0.25,
            Strategy::Aggressive => 0.40,
        }
    }
}

/// Sampling caps used by strategy selection.
const SAMPLE_CHAR_LIMIT: usize = 200_000;
const SAMPLE_LINE_LIMIT: usize = 1_000;
/// Distinct/total skeleton ratio above which Aggressive mode is chosen.
const AGGRESSIVE_RATIO_THRESHOLD: f64 = 0.10;

/// Runs the Strict pattern over a sample of the text to decide whether
/// Strict or Aggressive masking should be used for the rest of the block.
///
/// Mirrors the reference implementation's `_analyze_best_strategy`: the
/// sample is taken over lines *without* their terminators (plain
/// `splitlines()`, not `keepends=True`), since only line content, not its
/// exact byte layout, matters for this decision.
pub fn select_strategy(text: &str) -> Strategy {
    let sample_char_end = text
        .char_indices()
        .nth(SAMPLE_CHAR_LIMIT)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len());
    let sample = &text[..sample_char_end];
    let content_lines = strip_terminators(sample, SAMPLE_LINE_LIMIT);

    if content_lines.is_empty() {
        return Strategy::Strict;
    }

    let mut distinct = std::collections::HashSet::with_capacity(content_lines.len());
    for line in &content_lines {
        let skeleton = STRICT.replace_all(line, PH.to_string().as_str()).into_owned();
        distinct.insert(skeleton);
    }

    let ratio = distinct.len() as f64 / content_lines.len() as f64;
    if ratio > AGGRESSIVE_RATIO_THRESHOLD {
        Strategy::Aggressive
    } else {
        Strategy::Strict
    }
}

/// Splits `sample` into up to `limit` lines with terminators removed.
fn strip_terminators(sample: &str, limit: usize) -> Vec<String> {
    crate::lines::split_keepends(sample)
        .into_iter()
        .take(limit)
        .map(|line| {
            line.trim_end_matches(['\n', '\r'])
                .trim_end_matches(['\u{0B}', '\u{0C}', '\u{1C}', '\u{1D}', '\u{1E}', '\u{85}', '\u{2028}', '\u{2029}'])
                .to_string()
        })
        .collect()
}

/// The outcome of masking one line: its skeleton and the ordered literals
/// that were extracted from it.
pub struct Masked {
    pub skeleton: String,
    pub variables: Vec<String>,
}

/// Masks a single line using `strategy`.
///
/// Returns `None` if the raw line already contains a reserved sentinel
/// codepoint (`spec.md`'s collision guard), signaling that the whole block
/// must fall back to passthrough.
pub fn mask_line(line: &str, strategy: Strategy) -> Option<Masked> {
    if contains_sentinel(line) {
        return None;
    }

    let pattern = strategy.pattern();
    let mut variables = Vec::new();
    let mut skeleton = String::with_capacity(line.len());
    let mut last_end = 0;

    for m in pattern.find_iter(line) {
        skeleton.push_str(&line[last_end..m.start()]);
        let token = m.as_str();
        if let Some(stripped) = token.strip_prefix('"').and_then(|t| t.strip_suffix('"')) {
            variables.push(stripped.to_string());
            skeleton.push('"');
            skeleton.push(PH);
            skeleton.push('"');
        } else {
            variables.push(token.to_string());
            skeleton.push(PH);
        }
        last_end = m.end();
    }
    skeleton.push_str(&line[last_end..]);

    Some(Masked { skeleton, variables })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_quoted_and_numeric_literals() {
        let m = mask_line("name=\"alice\" age=30\n", Strategy::Strict).unwrap();
        assert_eq!(m.skeleton, "name=\"\u{E000}\" age=\u{E000}\n");
        assert_eq!(m.variables, vec!["alice", "30"]);
    }

    #[test]
    fn collision_guard_rejects_raw_sentinel() {
        assert!(mask_line("has \u{E000} already", Strategy::Strict).is_none());
        assert!(mask_line("has \u{E001} already", Strategy::Strict).is_none());
    }

    #[test]
    fn aggressive_masks_words_without_quotes() {
        let m = mask_line("GET /index.html 200\n", Strategy::Aggressive).unwrap();
        // "/" is not part of the aggressive word-class, so it stays literal.
        assert_eq!(m.variables, vec!["GET", "index.html", "200"]);
    }

    #[test]
    fn strict_decimal_alternative_shadows_hex_prefix() {
        // Faithful to the reference implementation: because the decimal
        // alternative is tried before the hex alternative at the same
        // position, "0x1a" only has its leading "0" masked.
        let m = mask_line("addr=0x1a\n", Strategy::Strict).unwrap();
        assert_eq!(m.variables, vec!["0"]);
        assert!(m.skeleton.starts_with("addr="));
        assert!(m.skeleton.contains("x1a"));
    }

    #[test]
    fn strategy_selection_picks_aggressive_for_high_diversity() {
        let mut text = String::new();
        for i in 0..20 {
            text.push_str(&format!("unique-line-{i}-{i}abc\n"));
        }
        assert_eq!(select_strategy(&text), Strategy::Aggressive);
    }

    #[test]
    fn strategy_selection_picks_strict_for_repetitive_logs() {
        let text = "a=1\na=2\na=3\na=4\na=5\n".repeat(10);
        assert_eq!(select_strategy(&text), Strategy::Strict);
    }
}
