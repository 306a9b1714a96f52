use chrono::{Datelike, Duration, Local, Months, NaiveDate, Weekday};

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

// Parse a date argument like "YYYY-MM-DD", "+30d" (days ahead) or "7d" / "-7d" (days back),
// relative to `today`. Returns None if unparseable.
pub fn parse_date_arg(s: &str, today: NaiveDate) -> Option<NaiveDate> {
    let s = s.trim();
    if let Some(stripped) = s.strip_suffix('d') {
        if let Some(ahead) = stripped.strip_prefix('+') {
            if let Ok(days) = ahead.parse::<i64>() {
                return today.checked_add_signed(Duration::days(days));
            }
        }
        let back = stripped.strip_prefix('-').unwrap_or(stripped);
        if let Ok(days) = back.parse::<i64>() {
            return today.checked_sub_signed(Duration::days(days));
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// First `weekday` on or after `from`.
pub fn next_weekday(from: NaiveDate, weekday: Weekday) -> NaiveDate {
    let ahead = (7 + weekday.num_days_from_monday() as i64
        - from.weekday().num_days_from_monday() as i64)
        % 7;
    from + Duration::days(ahead)
}

pub fn first_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).map(|first| next_weekday(first, weekday))
}

pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_add_months(Months::new(months)).unwrap_or(date)
}

pub fn start_of_year(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 1, 1).unwrap_or(date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

    #[test]
    fn next_weekday_includes_same_day() {
        // 2025-03-05 is a Wednesday
        assert_eq!(next_weekday(d(2025, 3, 5), Weekday::Wed), d(2025, 3, 5));
        assert_eq!(next_weekday(d(2025, 3, 6), Weekday::Wed), d(2025, 3, 12));
        assert_eq!(next_weekday(d(2025, 3, 5), Weekday::Thu), d(2025, 3, 6));
    }

    #[test]
    fn first_wednesday() {
        assert_eq!(first_weekday_of_month(2025, 10, Weekday::Wed), Some(d(2025, 10, 1)));
        assert_eq!(first_weekday_of_month(2025, 11, Weekday::Wed), Some(d(2025, 11, 5)));
    }

    #[test]
    fn date_args() {
        let today = d(2025, 6, 10);
        assert_eq!(parse_date_arg("+30d", today), Some(d(2025, 7, 10)));
        assert_eq!(parse_date_arg("7d", today), Some(d(2025, 6, 3)));
        assert_eq!(parse_date_arg("-7d", today), Some(d(2025, 6, 3)));
        assert_eq!(parse_date_arg("2025-01-02", today), Some(d(2025, 1, 2)));
        assert_eq!(parse_date_arg("soon", today), None);
    }

    #[test]
    fn add_months_clamps_to_month_end() {
        assert_eq!(add_months(d(2025, 1, 31), 1), d(2025, 2, 28));
    }
}
