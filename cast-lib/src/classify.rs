//! Input classification: binary sniffing and text decoding (`spec.md` §4.1).

/// How many leading bytes the binary sniff inspects.
const SNIFF_WINDOW: usize = 4096;
/// Suspicious-byte ratio above which a block is classified as binary.
const BINARY_RATIO_THRESHOLD: f64 = 0.01;

/// Why a block could not be run through the templating engine and must be
/// passed through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    /// The binary sniff classified the block as non-text.
    Binary,
    /// Neither UTF-8 nor Latin-1 decoding succeeded.
    DecodeFail,
    /// A line already contained a reserved sentinel codepoint.
    Collision,
    /// The template dictionary would have grown past the entropy guard.
    Entropy,
}

impl PassthroughReason {
    pub fn as_str(self) -> &'static str {
        match self {
            PassthroughReason::Binary => "Binary",
            PassthroughReason::DecodeFail => "DecodeFail",
            PassthroughReason::Collision => "Collision Protected",
            PassthroughReason::Entropy => "Entropy",
        }
    }
}

/// Counts NUL bytes and non-whitespace control bytes in the first
/// [`SNIFF_WINDOW`] bytes; returns `true` if their ratio exceeds
/// [`BINARY_RATIO_THRESHOLD`].
pub fn looks_binary(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }
    let sample = &data[..data.len().min(SNIFF_WINDOW)];

    let suspicious = sample
        .iter()
        .filter(|&&b| b == 0 || (b < 32 && b != 9 && b != 10 && b != 13))
        .count();

    (suspicious as f64) / (sample.len() as f64) > BINARY_RATIO_THRESHOLD
}

/// The result of decoding a block's raw bytes into text.
pub struct Decoded {
    pub text: String,
    pub is_latin1: bool,
}

/// Decodes `data` as UTF-8, falling back to Latin-1 on failure.
///
/// Latin-1 decoding cannot itself fail (every byte value is a valid Latin-1
/// codepoint); the `None` return exists only for symmetry with the
/// reference implementation's defensive double-fallback and is never
/// produced in practice.
pub fn decode_text(data: &[u8]) -> Option<Decoded> {
    if let Ok(text) = std::str::from_utf8(data) {
        return Some(Decoded {
            text: text.to_owned(),
            is_latin1: false,
        });
    }

    Some(Decoded {
        text: decode_latin1(data),
        is_latin1: true,
    })
}

/// Decodes a byte slice as Latin-1 (ISO-8859-1): each byte maps directly to
/// the Unicode scalar value of the same ordinal.
pub fn decode_latin1(data: &[u8]) -> String {
    data.iter().map(|&b| b as char).collect()
}

/// Re-encodes a string as Latin-1 bytes.
///
/// Returns `None` if any character is outside the Latin-1 range
/// (`> U+00FF`), per the "Latin-1 restoration failure" case in `spec.md`
/// §4.9/§7.
pub fn encode_latin1(text: &str) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    for ch in text.chars() {
        let code = ch as u32;
        if code > 0xFF {
            return None;
        }
        out.push(code as u8);
    }
    Some(out)
}
