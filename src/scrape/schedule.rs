// Vendor distribution-schedule page: group mapping table plus the dated schedule tables
// that follow the "Target 12" and "Weekly Payers / Groups" headings.

use std::sync::OnceLock;

use chrono::{Duration, NaiveDate, Utc};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use super::collapse_whitespace;
use super::dates::find_date;
use super::table::cell_texts;
use crate::etf::{
    DividendEvent, Group, GroupMap, GroupSchedule, Schedule, default_frequency, filter_upcoming,
};

pub const UPCOMING_DAYS: i64 = 30;

fn symbol_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Z]{3,5}$").expect("valid regex"))
}

fn group_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"Group\s+([ABCD])").expect("valid regex"))
}

pub fn parse_schedule_page(html: &str, today: NaiveDate) -> Schedule {
    let doc = Html::parse_document(html);
    let mut mapping = GroupMap::builtin();
    mapping.merge_over(&parse_group_mapping(&doc));

    let events = parse_schedule_events(&doc, today);
    let groups = build_group_schedules(&mapping, &events, today);
    let all: Vec<DividendEvent> = groups.iter().flat_map(|g| g.events.iter().cloned()).collect();

    Schedule { updated_at: Utc::now(), upcoming: filter_upcoming(&all, today, UPCOMING_DAYS), groups }
}

/// Symbol mapping as published in a schedule's group listings.
pub fn mapping_from_schedule(schedule: &Schedule) -> GroupMap {
    let mut map = GroupMap::empty();
    for g in &schedule.groups {
        for s in &g.etfs { map.insert(s, g.group); }
    }
    map
}

fn symbols_in(cell: &str) -> Vec<&str> {
    cell.split_whitespace().filter(|w| symbol_re().is_match(w)).collect()
}

/// Columns: Weekly | Group A | row id | Group B | Group C | Group D.
pub fn parse_group_mapping(doc: &Html) -> GroupMap {
    let mut map = GroupMap::empty();
    let (Ok(table_sel), Ok(tr), Ok(td)) =
        (Selector::parse("table"), Selector::parse("tr"), Selector::parse("td"))
    else {
        return map;
    };
    let columns = [
        (0, Group::Weekly),
        (1, Group::GroupA),
        (3, Group::GroupB),
        (4, Group::GroupC),
        (5, Group::GroupD),
    ];
    for table in doc.select(&table_sel) {
        let text = table.text().collect::<String>();
        if !(text.contains("Weekly Payers") && text.contains("Group A")) {
            continue;
        }
        for row in table.select(&tr) {
            let cells = cell_texts(row, &td);
            if cells.len() < 6 { continue; }
            for (idx, group) in columns {
                for sym in symbols_in(&cells[idx]) { map.insert(sym, group); }
            }
        }
    }
    map
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ScheduleTable {
    Target12,
    Groups,
}

fn classify_heading(text: &str) -> Option<ScheduleTable> {
    if text.contains("Target 12") {
        Some(ScheduleTable::Target12)
    } else if text.contains("Weekly Payers") || text.contains("Groups A") {
        Some(ScheduleTable::Groups)
    } else {
        None
    }
}

fn is_heading(el: &ElementRef<'_>) -> bool {
    matches!(el.value().name(), "h1" | "h2" | "h3" | "h4")
}

// First table after the heading, stopping at the next heading.
fn table_after<'a>(heading: ElementRef<'a>, table_sel: &Selector) -> Option<ElementRef<'a>> {
    for sib in heading.next_siblings().filter_map(ElementRef::wrap) {
        if is_heading(&sib) { return None; }
        if sib.value().name() == "table" { return Some(sib); }
        if let Some(t) = sib.select(table_sel).next() { return Some(t); }
    }
    None
}

/// Group-wide events (empty symbol) from the dated schedule tables.
pub fn parse_schedule_events(doc: &Html, today: NaiveDate) -> Vec<DividendEvent> {
    let (Ok(h_sel), Ok(table_sel), Ok(tr), Ok(td)) = (
        Selector::parse("h1, h2, h3, h4"),
        Selector::parse("table"),
        Selector::parse("tr"),
        Selector::parse("td"),
    ) else {
        return Vec::new();
    };

    let mut events = Vec::new();
    for heading in doc.select(&h_sel) {
        let text = collapse_whitespace(&heading.text().collect::<String>());
        let Some(kind) = classify_heading(&text) else { continue };
        let Some(table) = table_after(heading, &table_sel) else { continue };
        for row in table.select(&tr) {
            let cells = cell_texts(row, &td);
            if cells.is_empty() { continue; }
            let group = match kind {
                ScheduleTable::Target12 => Some(Group::Target12),
                ScheduleTable::Groups => resolve_group(&cells[0]),
            };
            let Some(group) = group else { continue };
            if let Some(ev) = row_event(&cells, group, today) {
                events.push(ev);
            }
        }
    }
    events
}

pub fn resolve_group(text: &str) -> Option<Group> {
    if let Some(caps) = group_re().captures(text) {
        return Group::from_letter(&caps[1]);
    }
    if text.contains("Weekly") {
        Some(Group::Weekly)
    } else if text.contains("Target 12") {
        Some(Group::Target12)
    } else {
        None
    }
}

// Trailing dates are declared, ex, pay; two dates are ex, pay.
fn row_event(cells: &[String], group: Group, today: NaiveDate) -> Option<DividendEvent> {
    let dates: Vec<NaiveDate> = cells.iter().filter_map(|c| find_date(c, today)).collect();
    let (declare, ex, pay) = match dates.as_slice() {
        [] => return None,
        [ex] => (None, *ex, None),
        [ex, pay] => (None, *ex, Some(*pay)),
        [.., declare, ex, pay] => (Some(*declare), *ex, Some(*pay)),
    };
    let mut ev = DividendEvent::new("", ex, 0.0);
    ev.pay_date = Some(pay.unwrap_or(ex + Duration::days(1)));
    ev.declare_date = Some(declare.unwrap_or(ex - Duration::days(1)));
    ev.group = Some(group);
    ev.frequency = Some(default_frequency(group));
    Some(ev)
}

/// One schedule per mapped group, sorted by group name. Group-wide events
/// (empty symbol) are expanded to every member.
pub fn build_group_schedules(mapping: &GroupMap, events: &[DividendEvent], today: NaiveDate) -> Vec<GroupSchedule> {
    let mut out = Vec::new();
    for group in Group::ALL {
        let members: Vec<String> = mapping.members(group).into_iter().map(str::to_string).collect();
        if members.is_empty() { continue; }
        let frequency = default_frequency(group);

        let mut group_events: Vec<DividendEvent> = Vec::new();
        for ev in events {
            let ev_group = ev.group.unwrap_or_else(|| mapping.group_for(&ev.symbol));
            if ev_group != group { continue; }
            let mut base = ev.clone();
            base.group = Some(group);
            base.frequency = Some(base.frequency.unwrap_or(frequency));
            if ev.symbol.is_empty() {
                for sym in &members {
                    let mut e = base.clone();
                    e.symbol = sym.clone();
                    group_events.push(e);
                }
            } else {
                group_events.push(base);
            }
        }
        group_events.sort_by(|a, b| a.ex_date.cmp(&b.ex_date).then_with(|| a.symbol.cmp(&b.symbol)));

        let next = group_events.iter().find(|e| e.ex_date > today);
        out.push(GroupSchedule {
            group,
            frequency,
            next_ex_date: next.map(|e| e.ex_date),
            next_pay_date: next.and_then(|e| e.pay_date),
            etfs: members,
            events: group_events,
        });
    }
    out.sort_by(|a, b| a.group.as_str().cmp(b.group.as_str()));
    out
}
