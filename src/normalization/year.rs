/// Truncate a date-ish string to a year by taking its first four characters.
///
/// Handles plain years ("2014"), ISO dates ("2014-10-10"), and ranges
/// ("2010–2012" keeps the start year). "N/A" and anything shorter than four
/// characters map to `None`.
pub fn truncate_year(raw: &str) -> Option<i32> {
    raw.trim().get(0..4)?.parse::<i32>().ok()
}
