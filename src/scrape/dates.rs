use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use super::collapse_whitespace;

const EARLIEST_YEAR: i32 = 2020;

// Month-name layouts the vendor and the data APIs use. Slash dates are handled separately
// so two-digit years can be widened before chrono sees them.
const NAMED_FORMATS: &[&str] = &["%Y-%m-%d", "%b %d, %Y", "%B %d, %Y", "%d-%b-%Y", "%d-%B-%Y"];

fn slash_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})$").expect("valid regex"))
}

fn embedded_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2}/\d{1,2}/(?:\d{4}|\d{2})|\d{4}-\d{2}-\d{2})\b").expect("valid regex")
    })
}

/// Parse a table-cell date. Rejects anything outside 2020..=next year.
pub fn parse_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = collapse_whitespace(text);
    if s.is_empty() {
        return None;
    }
    parse_exact(&s).filter(|d| in_range(*d, today))
}

/// Like `parse_date`, but also finds a numeric date inside surrounding text
/// ("Ex-Date: 3/5/25").
pub fn find_date(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    if let Some(d) = parse_date(text, today) {
        return Some(d);
    }
    embedded_re()
        .find_iter(text)
        .filter_map(|m| parse_exact(m.as_str()))
        .find(|d| in_range(*d, today))
}

fn parse_exact(s: &str) -> Option<NaiveDate> {
    if let Some(caps) = slash_re().captures(s) {
        let month: u32 = caps[1].parse().ok()?;
        let day: u32 = caps[2].parse().ok()?;
        let raw_year = &caps[3];
        let mut year: i32 = raw_year.parse().ok()?;
        if raw_year.len() == 2 {
            year += 2000;
        }
        return NaiveDate::from_ymd_opt(year, month, day);
    }
    NAMED_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn in_range(date: NaiveDate, today: NaiveDate) -> bool {
    (EARLIEST_YEAR..=today.year() + 1).contains(&date.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

    fn today() -> NaiveDate { d(2025, 6, 15) }

    #[test]
    fn slash_layouts() {
        assert_eq!(parse_date("03/05/2025", today()), Some(d(2025, 3, 5)));
        assert_eq!(parse_date("3/5/2025", today()), Some(d(2025, 3, 5)));
        assert_eq!(parse_date("03/05/25", today()), Some(d(2025, 3, 5)));
        assert_eq!(parse_date("3/5/25", today()), Some(d(2025, 3, 5)));
    }

    #[test]
    fn named_layouts() {
        assert_eq!(parse_date("2024-12-04", today()), Some(d(2024, 12, 4)));
        assert_eq!(parse_date("Jan 8, 2025", today()), Some(d(2025, 1, 8)));
        assert_eq!(parse_date("January 8, 2025", today()), Some(d(2025, 1, 8)));
        assert_eq!(parse_date("08-Jan-2025", today()), Some(d(2025, 1, 8)));
        assert_eq!(parse_date("08-January-2025", today()), Some(d(2025, 1, 8)));
    }

    #[test]
    fn whitespace_is_collapsed() {
        assert_eq!(parse_date("  Jan \n 8,   2025 ", today()), Some(d(2025, 1, 8)));
    }

    #[test]
    fn out_of_range_years_are_rejected() {
        assert_eq!(parse_date("03/05/2019", today()), None);
        assert_eq!(parse_date("03/05/2027", today()), None);
        assert_eq!(parse_date("03/05/2026", today()), Some(d(2026, 3, 5)));
    }

    #[test]
    fn garbage_and_impossible_dates() {
        assert_eq!(parse_date("", today()), None);
        assert_eq!(parse_date("TBD", today()), None);
        assert_eq!(parse_date("13/45/2025", today()), None);
        assert_eq!(parse_date("$0.53", today()), None);
    }

    #[test]
    fn find_date_inside_text() {
        assert_eq!(find_date("Ex-Date: 3/5/25 (est.)", today()), Some(d(2025, 3, 5)));
        assert_eq!(find_date("no date here", today()), None);
    }
}
