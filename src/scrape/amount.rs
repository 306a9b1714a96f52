use std::sync::OnceLock;

use regex::Regex;

fn number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\d+(\.\d+)?").expect("valid regex"))
}

fn percent_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)\s*%").expect("valid regex"))
}

/// Per-share distribution amount in dollars.
///
/// Accepts 0 < amount < 10. A bare integer between 10 and 999 is a cents value
/// (`53` -> `0.53`); anything else is treated as noise (a price, a share count, a year).
pub fn parse_amount(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != '$' && *c != ',').collect();
    let m = number_re().find(cleaned.trim())?;
    let raw = m.as_str();
    let value: f64 = raw.parse().ok()?;
    if value > 0.0 && value < 10.0 {
        return Some(value);
    }
    if !raw.contains('.') && (10.0..1000.0).contains(&value) {
        return Some(value / 100.0);
    }
    None
}

/// Share price such as "$1,234.56"; no range heuristics.
pub fn parse_price(text: &str) -> Option<f64> {
    let cleaned: String = text.chars().filter(|c| *c != '$' && *c != ',').collect();
    number_re().find(cleaned.trim())?.as_str().parse().ok()
}

/// First percentage in the text, e.g. "Distribution Rate 45.67%" -> 45.67.
pub fn parse_percent(text: &str) -> Option<f64> {
    percent_re().captures(text)?.get(1)?.as_str().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar_amounts() {
        assert_eq!(parse_amount("$0.5324"), Some(0.5324));
        assert_eq!(parse_amount(" 1.10 "), Some(1.10));
        assert_eq!(parse_amount("$2"), Some(2.0));
    }

    #[test]
    fn bare_integers_read_as_cents() {
        assert_eq!(parse_amount("53"), Some(0.53));
        assert_eq!(parse_amount("120"), Some(1.20));
    }

    #[test]
    fn rejects_out_of_bounds() {
        assert_eq!(parse_amount("0"), None);
        assert_eq!(parse_amount("0.00"), None);
        assert_eq!(parse_amount("12.50"), None);
        assert_eq!(parse_amount("1,234"), None);
        assert_eq!(parse_amount("n/a"), None);
        assert_eq!(parse_amount(""), None);
    }

    #[test]
    fn prices_keep_large_values() {
        assert_eq!(parse_price("$1,234.56"), Some(1234.56));
        assert_eq!(parse_price("$17.42"), Some(17.42));
        assert_eq!(parse_price("n/a"), None);
    }

    #[test]
    fn percent() {
        assert_eq!(parse_percent("Distribution Rate 45.67%"), Some(45.67));
        assert_eq!(parse_percent("12 %"), Some(12.0));
        assert_eq!(parse_percent("45.67"), None);
    }
}
