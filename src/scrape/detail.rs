use chrono::NaiveDate;
use scraper::{ElementRef, Html, Selector};

use super::amount::{parse_percent, parse_price};
use super::collapse_whitespace;
use super::table::read_tables;
use crate::etf::{DividendEvent, EtfDetail, Frequency};
use crate::etf::stats::sort_newest_first;

pub fn parse_detail_page(html: &str, symbol: &str, today: NaiveDate) -> EtfDetail {
    let doc = Html::parse_document(html);
    let symbol = symbol.trim().to_ascii_uppercase();

    let mut history: Vec<DividendEvent> = read_tables(&doc)
        .iter()
        .filter(|t| t.is_dividend_table())
        .flat_map(|t| t.events(&symbol, today))
        .collect();
    dedup_by_ex_date(&mut history);

    // The key-metrics block wins over the free-text heuristics when the page has one.
    let metrics = key_metrics(&doc);
    EtfDetail {
        name: extract_name(&doc, &symbol),
        description: extract_description(&doc),
        frequency: metrics.frequency.or_else(|| extract_frequency(&doc)),
        current_yield: metrics.yield_pct.or_else(|| extract_distribution_rate(&doc)),
        current_price: metrics.price,
        history,
        symbol,
    }
}

#[derive(Default)]
struct KeyMetrics {
    price: Option<f64>,
    yield_pct: Option<f64>,
    frequency: Option<Frequency>,
}

fn key_metrics(doc: &Html) -> KeyMetrics {
    let mut out = KeyMetrics::default();
    let (Ok(item), Ok(label), Ok(value)) = (
        Selector::parse(".key-metrics .metric-item"),
        Selector::parse(".metric-label"),
        Selector::parse(".metric-value"),
    ) else {
        return out;
    };
    let first_text = |el: ElementRef<'_>, sel: &Selector| {
        el.select(sel).next().map(|n| collapse_whitespace(&n.text().collect::<String>()))
    };
    for el in doc.select(&item) {
        let (Some(l), Some(v)) = (first_text(el, &label), first_text(el, &value)) else { continue };
        let l = l.to_lowercase();
        if l.contains("yield") {
            out.yield_pct = parse_percent(&v).or_else(|| v.trim().parse().ok()).or(out.yield_pct);
        } else if l.contains("price") {
            out.price = parse_price(&v).or(out.price);
        } else if l.contains("frequency") {
            let v = v.to_lowercase();
            if v.contains("week") {
                out.frequency = Some(Frequency::Weekly);
            } else if v.contains("month") {
                out.frequency = Some(Frequency::Monthly);
            }
        }
    }
    out
}

// Newest first; the first row seen for an ex-date wins.
fn dedup_by_ex_date(events: &mut Vec<DividendEvent>) {
    let mut seen = std::collections::HashSet::new();
    events.retain(|e| seen.insert(e.ex_date));
    sort_newest_first(events);
}

fn texts(doc: &Html, selector: &str) -> Vec<String> {
    let Ok(sel) = Selector::parse(selector) else { return Vec::new() };
    doc.select(&sel)
        .map(|n| collapse_whitespace(&n.text().collect::<String>()))
        .filter(|s| !s.is_empty())
        .collect()
}

fn extract_name(doc: &Html, symbol: &str) -> Option<String> {
    let headings = texts(doc, "h1, h2");
    headings
        .iter()
        .find(|h| h.contains("YieldMax") && h.contains(symbol))
        .or_else(|| headings.iter().find(|h| h.contains("Option Income") || h.contains("YieldMax")))
        .cloned()
}

fn extract_description(doc: &Html) -> Option<String> {
    if let Some(s) = texts(doc, ".fund-description").into_iter().next() {
        return Some(s);
    }
    for sel in ["meta[name=description]", "meta[property=\"og:description\"]"] {
        let Ok(sel) = Selector::parse(sel) else { continue };
        if let Some(content) = doc.select(&sel).next().and_then(|n| n.value().attr("content")) {
            let s = collapse_whitespace(content);
            if !s.is_empty() { return Some(s); }
        }
    }
    None
}

fn extract_frequency(doc: &Html) -> Option<Frequency> {
    for p in texts(doc, "p") {
        let lower = p.to_lowercase();
        if lower.contains("monthly distribution") || lower.contains("monthly income") {
            return Some(Frequency::Monthly);
        }
        if lower.contains("weekly distribution") || lower.contains("weekly income") {
            return Some(Frequency::Weekly);
        }
    }
    None
}

// The rate sits either in the label element itself or in a sibling under the same parent.
fn extract_distribution_rate(doc: &Html) -> Option<f64> {
    const LABEL: &str = "Distribution Rate";
    let sel = Selector::parse("body *").ok()?;
    let contains = |n: &ElementRef<'_>| n.text().collect::<String>().contains(LABEL);
    let after_label = |n: ElementRef<'_>| {
        let text = collapse_whitespace(&n.text().collect::<String>());
        text.split(LABEL).nth(1).and_then(parse_percent)
    };
    doc.select(&sel)
        .filter(|n| contains(n) && !n.children().filter_map(ElementRef::wrap).any(|c| contains(&c)))
        .find_map(|label| {
            after_label(label).or_else(|| label.parent().and_then(ElementRef::wrap).and_then(after_label))
        })
}
