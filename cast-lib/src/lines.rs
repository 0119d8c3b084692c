//! Line splitting with terminators retained, matching Python's
//! `str.splitlines(keepends=True)` semantics (`spec.md` §4.3).
//!
//! Lines must carry their own terminator so that mixed CRLF/LF files and
//! files missing a trailing newline round-trip byte-for-byte through the
//! templating engine (`spec.md` §8).

/// Unicode line-boundary codepoints recognized by Python's `splitlines`,
/// beyond the ASCII ones handled specially below.
const EXTRA_LINE_BOUNDARIES: [char; 5] = ['\u{0B}', '\u{0C}', '\u{1C}', '\u{1D}', '\u{1E}'];

/// Splits `text` into lines, each one retaining its trailing terminator.
/// A `\r\n` pair is kept together as a single terminator. The final line is
/// returned even if it has no terminator; a trailing terminator never
/// produces an extra empty line afterward.
pub fn split_keepends(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        current.push(ch);

        let is_boundary = ch == '\n'
            || ch == '\r'
            || ch == '\u{85}'
            || ch == '\u{2028}'
            || ch == '\u{2029}'
            || EXTRA_LINE_BOUNDARIES.contains(&ch);

        if !is_boundary {
            continue;
        }

        if ch == '\r' && chars.peek() == Some(&'\n') {
            current.push(chars.next().unwrap());
        }

        lines.push(std::mem::take(&mut current));
    }

    if !current.is_empty() {
        lines.push(current);
    }

    lines
}
