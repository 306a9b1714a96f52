// Built-in symbol -> group table from the vendor's published distribution schedule.
// Used when the schedule page can't be parsed, and to fill in symbols the page omits.

use std::collections::BTreeMap;

use chrono::{Datelike, Duration, NaiveDate, Weekday};

use super::types::{Frequency, Group};
use crate::util::time::{first_weekday_of_month, next_weekday};

const GROUPS: &[(&str, Group)] = &[
    // Target 12
    ("BIGY", Group::Target12),
    ("SOXY", Group::Target12),
    ("RNTY", Group::Target12),
    ("KLIP", Group::Target12),
    ("ALTY", Group::Target12),
    // Weekly payers
    ("CHPY", Group::Weekly),
    ("GPTY", Group::Weekly),
    ("LFGY", Group::Weekly),
    ("QDTY", Group::Weekly),
    ("RDTY", Group::Weekly),
    ("SDTY", Group::Weekly),
    ("ULTY", Group::Weekly),
    ("YMAG", Group::Weekly),
    ("YMAX", Group::Weekly),
    // Group A
    ("TSLY", Group::GroupA),
    ("NVDY", Group::GroupA),
    ("MSTY", Group::GroupA),
    ("OARK", Group::GroupA),
    ("AMDY", Group::GroupA),
    ("GOOY", Group::GroupA),
    ("JPMO", Group::GroupA),
    ("MRNY", Group::GroupA),
    ("SNOY", Group::GroupA),
    ("TSMY", Group::GroupA),
    ("APLY", Group::GroupA),
    // Group B
    ("AMZY", Group::GroupB),
    ("FBY", Group::GroupB),
    ("NFLY", Group::GroupB),
    ("QQLY", Group::GroupB),
    ("AIPY", Group::GroupB),
    ("BABO", Group::GroupB),
    ("DISO", Group::GroupB),
    ("MSFO", Group::GroupB),
    ("PYPY", Group::GroupB),
    ("SQY", Group::GroupB),
    ("XOMO", Group::GroupB),
    // Group C
    ("CONY", Group::GroupC),
    ("AIYY", Group::GroupC),
    ("BALY", Group::GroupC),
    ("COWY", Group::GroupC),
    ("CRSY", Group::GroupC),
    ("FIAT", Group::GroupC),
    ("GPIY", Group::GroupC),
    ("INTY", Group::GroupC),
    ("JEPY", Group::GroupC),
    ("KODY", Group::GroupC),
    ("NETY", Group::GroupC),
    ("PLTY", Group::GroupC),
    ("SPYY", Group::GroupC),
    ("WUGI", Group::GroupC),
    // Group D
    ("ABNY", Group::GroupD),
    ("AFRM", Group::GroupD),
    ("BKSY", Group::GroupD),
    ("BOLDY", Group::GroupD),
    ("CVY", Group::GroupD),
    ("DFLY", Group::GroupD),
    ("DSNY", Group::GroupD),
    ("GDXY", Group::GroupD),
    ("HPAY", Group::GroupD),
    ("JETY", Group::GroupD),
    ("LCID", Group::GroupD),
    ("MARO", Group::GroupD),
    ("MRSY", Group::GroupD),
    ("PEY", Group::GroupD),
    ("AMDL", Group::GroupD),
];

/// Symbol -> group lookup. Starts from the built-in table; page scrapes can override it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GroupMap {
    inner: BTreeMap<String, Group>,
}

impl Default for GroupMap {
    fn default() -> Self { Self::builtin() }
}

impl GroupMap {
    pub fn builtin() -> Self {
        let inner = GROUPS.iter().map(|(s, g)| (s.to_string(), *g)).collect();
        Self { inner }
    }

    pub fn empty() -> Self { Self { inner: BTreeMap::new() } }

    pub fn group_for(&self, symbol: &str) -> Group {
        self.inner
            .get(&symbol.trim().to_ascii_uppercase())
            .copied()
            .unwrap_or(Group::Unknown)
    }

    pub fn insert(&mut self, symbol: &str, group: Group) {
        self.inner.insert(symbol.trim().to_ascii_uppercase(), group);
    }

    /// Page-scraped entries win; built-in entries the page left out are kept.
    pub fn merge_over(&mut self, scraped: &GroupMap) {
        for (s, g) in &scraped.inner { self.inner.insert(s.clone(), *g); }
    }

    /// All symbols, sorted alphabetically.
    pub fn symbols(&self) -> Vec<&str> {
        self.inner.keys().map(String::as_str).collect()
    }

    pub fn members(&self, group: Group) -> Vec<&str> {
        self.inner.iter().filter(|(_, g)| **g == group).map(|(s, _)| s.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, Group)> {
        self.inner.iter().map(|(s, g)| (s.as_str(), *g))
    }

    pub fn len(&self) -> usize { self.inner.len() }
}

pub fn default_frequency(group: Group) -> Frequency {
    match group {
        Group::Weekly => Frequency::Weekly,
        _ => Frequency::Monthly,
    }
}

pub fn display_name(symbol: &str, group: Group) -> String {
    match group {
        Group::Target12 => format!("YieldMax {symbol} Target 12 ETF"),
        Group::Weekly => format!("YieldMax {symbol} Weekly ETF"),
        _ => format!("YieldMax {symbol} Option Income Strategy ETF"),
    }
}

/// Best guess at a group's next ex-date when the schedule page gave us nothing.
pub fn next_dividend_date(group: Group, today: NaiveDate) -> NaiveDate {
    match group {
        Group::GroupA | Group::GroupB | Group::GroupC | Group::GroupD => next_weekday(today, Weekday::Wed),
        Group::Weekly => next_weekday(today, Weekday::Thu),
        Group::Target12 => {
            let (y, m) = if today.month() == 12 { (today.year() + 1, 1) } else { (today.year(), today.month() + 1) };
            first_weekday_of_month(y, m, Weekday::Wed).unwrap_or(today + Duration::days(7))
        }
        Group::Unknown => today + Duration::days(7),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

    #[test]
    fn lookup_is_case_insensitive() {
        let map = GroupMap::builtin();
        assert_eq!(map.group_for("cony"), Group::GroupC);
        assert_eq!(map.group_for("YMAX"), Group::Weekly);
        assert_eq!(map.group_for("SPY"), Group::Unknown);
    }

    #[test]
    fn symbols_sorted_and_unique() {
        let map = GroupMap::builtin();
        let syms = map.symbols();
        let mut sorted = syms.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(syms, sorted);
        assert_eq!(syms.len(), GROUPS.len());
    }

    #[test]
    fn scraped_entries_override_builtin() {
        let mut map = GroupMap::builtin();
        let mut scraped = GroupMap::empty();
        scraped.insert("CONY", Group::GroupB);
        scraped.insert("NEWY", Group::GroupA);
        map.merge_over(&scraped);
        assert_eq!(map.group_for("CONY"), Group::GroupB);
        assert_eq!(map.group_for("NEWY"), Group::GroupA);
        assert_eq!(map.group_for("TSLY"), Group::GroupA);
    }

    #[test]
    fn next_dates_by_group() {
        // Friday
        let today = d(2025, 10, 17);
        assert_eq!(next_dividend_date(Group::GroupB, today), d(2025, 10, 22));
        assert_eq!(next_dividend_date(Group::Weekly, today), d(2025, 10, 23));
        assert_eq!(next_dividend_date(Group::Target12, today), d(2025, 11, 5));
        assert_eq!(next_dividend_date(Group::Target12, d(2025, 12, 20)), d(2026, 1, 7));
        assert_eq!(next_dividend_date(Group::Unknown, today), d(2025, 10, 24));
    }

    #[test]
    fn names_and_frequency() {
        assert_eq!(display_name("BIGY", Group::Target12), "YieldMax BIGY Target 12 ETF");
        assert_eq!(default_frequency(Group::Weekly), Frequency::Weekly);
        assert_eq!(default_frequency(Group::GroupA), Frequency::Monthly);
    }
}
