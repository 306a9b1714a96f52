// Generic HTML dividend tables: header-role inference and row parsing.

use chrono::{Duration, NaiveDate};
use scraper::{ElementRef, Html, Selector};

use super::amount::parse_amount;
use super::collapse_whitespace;
use super::dates::parse_date;
use crate::etf::DividendEvent;

const DIVIDEND_KEYWORDS: &[&str] = &["dividend", "distribution", "ex-date", "ex date", "amount", "pay date", "payable"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnRole {
    ExDate,
    PayDate,
    DeclareDate,
    RecordDate,
    Amount,
    Ticker,
    Ignore,
}

impl ColumnRole {
    pub fn from_header(header: &str) -> Self {
        let h = header.to_lowercase();
        let has = |keys: &[&str]| keys.iter().any(|k| h.contains(k));
        if has(&["ex-date", "ex date", "ex-dividend"]) {
            ColumnRole::ExDate
        } else if has(&["pay date", "payable", "payment"]) {
            ColumnRole::PayDate
        } else if has(&["declar"]) {
            ColumnRole::DeclareDate
        } else if has(&["record"]) {
            ColumnRole::RecordDate
        } else if has(&["amount", "per share", "distribution", "dividend", "rate"]) {
            ColumnRole::Amount
        } else if has(&["ticker", "symbol", "fund"]) {
            ColumnRole::Ticker
        } else {
            ColumnRole::Ignore
        }
    }

    pub fn is_date(&self) -> bool {
        matches!(self, ColumnRole::ExDate | ColumnRole::PayDate | ColumnRole::DeclareDate | ColumnRole::RecordDate)
    }
}

/// A table pulled out of a page: header texts and data rows, whitespace-collapsed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RawTable {
    pub class: String,
    pub id: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn roles(&self) -> Vec<ColumnRole> {
        self.headers.iter().map(|h| ColumnRole::from_header(h)).collect()
    }

    pub fn is_dividend_table(&self) -> bool {
        let roles = self.roles();
        if roles.iter().any(ColumnRole::is_date) && roles.contains(&ColumnRole::Amount) {
            return true;
        }
        let plugin_table = self.class.contains("wpDataTable") || self.id.starts_with("table_");
        if plugin_table {
            let joined = self.headers.join(" ").to_lowercase();
            return DIVIDEND_KEYWORDS.iter().any(|k| joined.contains(k));
        }
        false
    }

    /// Every parsable row of this table; unparsable rows are dropped.
    pub fn events(&self, symbol: &str, today: NaiveDate) -> Vec<DividendEvent> {
        let roles = self.roles();
        self.rows.iter().filter_map(|cells| parse_row(cells, &roles, symbol, today)).collect()
    }
}

pub fn cell_texts(row: ElementRef<'_>, selector: &Selector) -> Vec<String> {
    row.select(selector)
        .map(|c| collapse_whitespace(&c.text().collect::<String>()))
        .collect()
}

pub fn read_table(table: ElementRef<'_>) -> Option<RawTable> {
    let tr = Selector::parse("tr").ok()?;
    let th = Selector::parse("th").ok()?;
    let td = Selector::parse("td").ok()?;
    let th_or_td = Selector::parse("th, td").ok()?;

    let rows: Vec<ElementRef<'_>> = table.select(&tr).collect();
    // Header is the first row with <th> cells; tables without any use their first row.
    let header_idx = rows.iter().position(|r| r.select(&th).next().is_some()).unwrap_or(0);
    let headers = rows.get(header_idx).map(|r| cell_texts(*r, &th_or_td)).unwrap_or_default();
    let body = rows
        .iter()
        .skip(header_idx + 1)
        .map(|r| cell_texts(*r, &td))
        .filter(|cells| !cells.is_empty())
        .collect();

    Some(RawTable {
        class: table.value().attr("class").unwrap_or_default().to_string(),
        id: table.value().attr("id").unwrap_or_default().to_string(),
        headers,
        rows: body,
    })
}

pub fn read_tables(doc: &Html) -> Vec<RawTable> {
    let Ok(sel) = Selector::parse("table") else { return Vec::new() };
    doc.select(&sel).filter_map(read_table).collect()
}

fn is_symbol(s: &str) -> bool {
    (2..=5).contains(&s.len()) && s.chars().all(|c| c.is_ascii_uppercase())
}

#[derive(Default)]
struct RowFields {
    ticker: Option<String>,
    amount: Option<f64>,
    ex: Option<NaiveDate>,
    pay: Option<NaiveDate>,
    declare: Option<NaiveDate>,
    record: Option<NaiveDate>,
}

pub fn parse_row(cells: &[String], roles: &[ColumnRole], symbol: &str, today: NaiveDate) -> Option<DividendEvent> {
    let by_role = roles.contains(&ColumnRole::ExDate) && roles.contains(&ColumnRole::Amount);
    let f = if by_role {
        read_by_role(cells, roles, today)
    } else if cells.len() >= 6 {
        read_positional(cells, today)
    } else if cells.len() >= 4 {
        read_scan(cells, today)
    } else {
        return None;
    };

    let ex = f.ex?;
    let amount = f.amount.filter(|a| *a > 0.0)?;
    let sym = f
        .ticker
        .filter(|t| is_symbol(t))
        .unwrap_or_else(|| symbol.trim().to_ascii_uppercase());

    let mut event = DividendEvent::new(sym, ex, amount);
    event.pay_date = Some(f.pay.unwrap_or(ex + Duration::days(1)));
    event.declare_date = Some(f.declare.unwrap_or(ex - Duration::days(1)));
    event.record_date = f.record;
    Some(event)
}

fn read_by_role(cells: &[String], roles: &[ColumnRole], today: NaiveDate) -> RowFields {
    let mut f = RowFields::default();
    for (cell, role) in cells.iter().zip(roles) {
        match role {
            ColumnRole::ExDate => f.ex = f.ex.or_else(|| parse_date(cell, today)),
            ColumnRole::PayDate => f.pay = f.pay.or_else(|| parse_date(cell, today)),
            ColumnRole::DeclareDate => f.declare = f.declare.or_else(|| parse_date(cell, today)),
            ColumnRole::RecordDate => f.record = f.record.or_else(|| parse_date(cell, today)),
            ColumnRole::Amount => f.amount = f.amount.or_else(|| parse_amount(cell)),
            ColumnRole::Ticker => {
                if f.ticker.is_none() && !cell.is_empty() { f.ticker = Some(cell.clone()); }
            }
            ColumnRole::Ignore => {}
        }
    }
    f
}

// Vendor layout: ticker, amount, declared, ex, record, payable.
fn read_positional(cells: &[String], today: NaiveDate) -> RowFields {
    RowFields {
        ticker: Some(cells[0].clone()),
        amount: parse_amount(&cells[1]),
        declare: parse_date(&cells[2], today),
        ex: parse_date(&cells[3], today),
        record: parse_date(&cells[4], today),
        pay: parse_date(&cells[5], today),
    }
}

fn read_scan(cells: &[String], today: NaiveDate) -> RowFields {
    let mut f = RowFields::default();
    for cell in cells {
        // dates first, so "3/5/25" never reads as an amount
        if let Some(d) = parse_date(cell, today) {
            if f.ex.is_none() {
                f.ex = Some(d);
            } else if f.pay.is_none() {
                f.pay = Some(d);
            }
        } else if f.amount.is_none() {
            f.amount = parse_amount(cell);
        }
    }
    f
}
