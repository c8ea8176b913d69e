//! Invoice number formatting.
//!
//! Sequences are allocated by the store (one atomic increment per commit);
//! this module only renders them.

/// Renders `{prefix}-{seq:05}`.
///
/// ```rust
/// use gstbill_core::numbering::format_invoice_number;
///
/// assert_eq!(format_invoice_number("INV", 1), "INV-00001");
/// assert_eq!(format_invoice_number("INV", 123456), "INV-123456");
/// ```
pub fn format_invoice_number(prefix: &str, seq: i64) -> String {
    format!("{}-{:05}", prefix, seq)
}

/// Sequence part of `number` when it was rendered under `prefix`.
///
/// ```rust
/// use gstbill_core::numbering::parse_sequence;
///
/// assert_eq!(parse_sequence("INV", "INV-00042"), Some(42));
/// assert_eq!(parse_sequence("INV", "GST-00042"), None);
/// ```
pub fn parse_sequence(prefix: &str, number: &str) -> Option<i64> {
    let digits = number.strip_prefix(prefix)?.strip_prefix('-')?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Highest sequence already used under `prefix`, or 0.
pub fn highest_sequence<'a>(prefix: &str, numbers: impl IntoIterator<Item = &'a str>) -> i64 {
    numbers
        .into_iter()
        .filter_map(|n| parse_sequence(prefix, n))
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_padding() {
        assert_eq!(format_invoice_number("INV", 42), "INV-00042");
        assert_eq!(format_invoice_number("GST24", 99999), "GST24-99999");
        assert_eq!(format_invoice_number("A", 100000), "A-100000");
    }

    #[test]
    fn test_parse_sequence_only_matches_own_prefix() {
        assert_eq!(parse_sequence("INV", "INV-123456"), Some(123456));
        assert_eq!(parse_sequence("INV", "INV-X-00001"), None);
        assert_eq!(parse_sequence("INV", "INV00001"), None);
        assert_eq!(parse_sequence("INV", "INV-"), None);
        assert_eq!(parse_sequence("IN", "INV-00001"), None);

        let used = ["INV-00003", "GST-00090", "INV-00011", "INV-00002"];
        assert_eq!(highest_sequence("INV", used), 11);
        assert_eq!(highest_sequence("NEW", used), 0);
    }
}
