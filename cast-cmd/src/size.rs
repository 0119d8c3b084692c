//! Human-readable byte-size parsing for `--chunk-size` / `--dict-size`
//! (`spec.md` §6).

use anyhow::{bail, Context};

/// Parses a size string such as `"100MB"`, `"1GB"`, `"512KB"`, `"4096B"`, or
/// a bare number of bytes.
pub fn parse_human_size(raw: &str) -> anyhow::Result<u64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("empty size value");
    }
    let upper = trimmed.to_uppercase();

    let (digits, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
        (n, 1024u64.pow(3))
    } else if let Some(n) = upper.strip_suffix("MB") {
        (n, 1024u64.pow(2))
    } else if let Some(n) = upper.strip_suffix("KB") {
        (n, 1024)
    } else if let Some(n) = upper.strip_suffix('B') {
        (n, 1)
    } else {
        (upper.as_str(), 1)
    };

    let value: f64 = digits
        .trim()
        .parse()
        .with_context(|| format!("invalid size format '{raw}'"))?;
    Ok((value * multiplier as f64) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_suffixed_sizes() {
        assert_eq!(parse_human_size("1GB").unwrap(), 1024 * 1024 * 1024);
        assert_eq!(parse_human_size("100MB").unwrap(), 100 * 1024 * 1024);
        assert_eq!(parse_human_size("512KB").unwrap(), 512 * 1024);
        assert_eq!(parse_human_size("4096B").unwrap(), 4096);
    }

    #[test]
    fn parses_bare_numbers_and_fractions() {
        assert_eq!(parse_human_size("2048").unwrap(), 2048);
        assert_eq!(parse_human_size("1.5MB").unwrap(), (1.5 * 1024.0 * 1024.0) as u64);
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_human_size("not-a-size").is_err());
        assert!(parse_human_size("").is_err());
    }
}
