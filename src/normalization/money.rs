/// Parse a monetary string like "$1,234,567" into whole currency units.
///
/// Currency symbols and thousands separators are stripped; "N/A", empty
/// input, and anything without a plain integer amount (including decimal
/// strings) map to `None`, not zero and not an error.
pub fn parse_money(raw: &str) -> Option<i64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("n/a") {
        return None;
    }
    let cleaned: String = trimmed
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() || cleaned.contains('.') {
        return None;
    }
    cleaned.parse::<i64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_symbols_and_separators() {
        assert_eq!(parse_money("$1,234,567"), Some(1_234_567));
        assert_eq!(parse_money("£12,345"), Some(12_345));
        assert_eq!(parse_money("1234567"), Some(1_234_567));
    }

    #[test]
    fn unusable_input_is_none_not_zero() {
        assert_eq!(parse_money("N/A"), None);
        assert_eq!(parse_money("n/a"), None);
        assert_eq!(parse_money(""), None);
        assert_eq!(parse_money("   "), None);
        assert_eq!(parse_money("unknown"), None);
    }

    #[test]
    fn decimal_amounts_are_rejected() {
        // Box-office figures are whole dollars; a decimal means the field
        // holds something else.
        assert_eq!(parse_money("$123.45"), None);
    }
}
