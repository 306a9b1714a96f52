use chrono::{Duration, NaiveDate};

use super::types::{DividendEvent, DividendHistory, DividendStats, Frequency};
use crate::util::time::{add_months, start_of_year};

/// Sort newest ex-date first. Stable, so same-day rows keep page order.
pub fn sort_newest_first(events: &mut [DividendEvent]) {
    events.sort_by(|a, b| b.ex_date.cmp(&a.ex_date));
}

pub fn compute_stats(events: &[DividendEvent], today: NaiveDate) -> DividendStats {
    if events.is_empty() {
        return DividendStats::default();
    }
    let mut sorted = events.to_vec();
    sort_newest_first(&mut sorted);

    let total: f64 = sorted.iter().map(|e| e.amount).sum();
    let ytd_start = start_of_year(today);
    let trailing_start = today - Duration::days(365);

    let year_to_date_total = sorted
        .iter()
        .filter(|e| e.ex_date >= ytd_start && e.ex_date <= today)
        .map(|e| e.amount)
        .sum();
    let trailing_year_total = sorted
        .iter()
        .filter(|e| e.ex_date > trailing_start && e.ex_date <= today)
        .map(|e| e.amount)
        .sum();

    let last_amount = sorted[0].amount;
    let change_percent = match sorted.get(1) {
        Some(prev) if prev.amount != 0.0 => (last_amount - prev.amount) / prev.amount * 100.0,
        _ => 0.0,
    };

    DividendStats {
        total_payments: sorted.len(),
        average_amount: total / sorted.len() as f64,
        last_amount,
        year_to_date_total,
        trailing_year_total,
        change_percent,
    }
}

/// Next (ex, pay) pair projected from the newest event in a history.
pub fn estimate_next(history: &DividendHistory, today: NaiveDate) -> Option<(NaiveDate, NaiveDate)> {
    let newest = history.events.iter().max_by_key(|e| e.ex_date)?;
    if newest.ex_date > today {
        let pay = newest.pay_date.unwrap_or(newest.ex_date + Duration::days(1));
        return Some((newest.ex_date, pay));
    }
    let ex = match history.frequency {
        Frequency::Weekly => newest.ex_date + Duration::days(7),
        Frequency::Monthly => add_months(newest.ex_date, 1),
    };
    Some((ex, ex + Duration::days(1)))
}

/// Events strictly inside (today, today + days), soonest first.
pub fn filter_upcoming(events: &[DividendEvent], today: NaiveDate, days: i64) -> Vec<DividendEvent> {
    let end = today + Duration::days(days);
    let mut out: Vec<DividendEvent> = events
        .iter()
        .filter(|e| e.ex_date > today && e.ex_date < end)
        .cloned()
        .collect();
    out.sort_by(|a, b| a.ex_date.cmp(&b.ex_date).then_with(|| a.symbol.cmp(&b.symbol)));
    out
}
