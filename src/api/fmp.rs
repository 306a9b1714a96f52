use std::collections::HashSet;

use chrono::{Duration, Months, NaiveDate, Utc};
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use super::{ApiError, RateLimiter, get_json, null_as_default, require_key};
use crate::config::AppConfig;
use crate::etf::{DividendEvent, EtfMetadata, GroupMap, default_frequency};
use crate::scrape::fetch::PageSource;

pub const SOURCE_NAME: &str = "Financial Modeling Prep";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DividendItem {
    #[serde(deserialize_with = "null_as_default")]
    symbol: String,
    #[serde(deserialize_with = "null_as_default")]
    date: String,
    #[serde(deserialize_with = "null_as_default")]
    adj_dividend: f64,
    #[serde(deserialize_with = "null_as_default")]
    dividend: f64,
    record_date: Option<String>,
    payment_date: Option<String>,
    declaration_date: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HistoricalResponse {
    historical: Vec<DividendItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct Profile {
    #[serde(deserialize_with = "null_as_default")]
    symbol: String,
    #[serde(deserialize_with = "null_as_default")]
    company_name: String,
    #[serde(deserialize_with = "null_as_default")]
    exchange: String,
    #[serde(deserialize_with = "null_as_default")]
    industry: String,
    #[serde(deserialize_with = "null_as_default")]
    sector: String,
    #[serde(deserialize_with = "null_as_default")]
    description: String,
    beta: Option<f64>,
    #[serde(deserialize_with = "null_as_default")]
    currency: String,
    #[serde(deserialize_with = "null_as_default")]
    country: String,
}

fn iso_date(s: Option<&str>) -> Option<NaiveDate> {
    s.filter(|s| !s.is_empty())
        .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
}

impl DividendItem {
    fn amount(&self) -> f64 {
        if self.adj_dividend > 0.0 { self.adj_dividend } else { self.dividend }
    }

    fn into_event(self, symbol: &str) -> Option<DividendEvent> {
        let ex = iso_date(Some(&self.date))?;
        let sym = if self.symbol.is_empty() { symbol.to_string() } else { self.symbol.clone() };
        let mut ev = DividendEvent::new(sym, ex, self.amount());
        ev.pay_date = iso_date(self.payment_date.as_deref());
        ev.declare_date = iso_date(self.declaration_date.as_deref());
        ev.record_date = iso_date(self.record_date.as_deref());
        Some(ev)
    }
}

const CONNECTION_SYMBOL: &str = "AAPL";

pub struct FmpClient<S> {
    source: S,
    api_key: String,
    base_url: String,
    limiter: RateLimiter,
}

impl<S: PageSource> FmpClient<S> {
    pub fn new(source: S, cfg: &AppConfig) -> Result<Self, ApiError> {
        Ok(Self {
            source,
            api_key: require_key(&cfg.fmp_key, "FMP_API_KEY")?,
            base_url: cfg.fmp_url.trim_end_matches('/').to_string(),
            limiter: RateLimiter::fmp(),
        })
    }

    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    fn url(&self, path: &str, params: &[(&str, &str)]) -> Result<String, ApiError> {
        let mut url = Url::parse(&format!("{}/{}", self.base_url, path)).map_err(|e| ApiError::Http(e.to_string()))?;
        url.query_pairs_mut().extend_pairs(params).append_pair("apikey", &self.api_key);
        Ok(url.into())
    }

    /// One cheap profile lookup, used to fail fast on a bad key or an unreachable host.
    pub async fn test_connection(&self) -> Result<(), ApiError> {
        self.profile(CONNECTION_SYMBOL).await.map(|_| ())
    }

    /// Events from the last `years` years, newest first as FMP returns them.
    pub async fn dividend_history(&self, symbol: &str, years: u32, today: NaiveDate) -> Result<Vec<DividendEvent>, ApiError> {
        self.limiter.acquire().await;
        let url = self.url(&format!("historical-price-full/stock_dividend/{symbol}"), &[])?;
        let resp: HistoricalResponse = get_json(&self.source, &url).await?;
        let cutoff = today.checked_sub_months(Months::new(12 * years)).unwrap_or(today);

        let events: Vec<DividendEvent> = resp
            .historical
            .into_iter()
            .filter_map(|item| {
                let raw = item.date.clone();
                let ev = item.into_event(symbol);
                if ev.is_none() { warn!(symbol, date = %raw, "unparsable ex-date; skipping"); }
                ev
            })
            .filter(|ev| ev.ex_date >= cutoff)
            .map(|mut ev| {
                ev.pay_date = ev.pay_date.or(Some(ev.ex_date + Duration::days(14)));
                ev.declare_date = ev.declare_date.or(Some(ev.ex_date - Duration::days(7)));
                ev
            })
            .collect();
        info!(symbol, events = events.len(), "fmp dividend history");
        Ok(events)
    }

    pub async fn dividend_calendar(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<DividendEvent>, ApiError> {
        self.limiter.acquire().await;
        let (from, to) = (from.format("%Y-%m-%d").to_string(), to.format("%Y-%m-%d").to_string());
        let url = self.url("stock_dividend_calendar", &[("from", &from), ("to", &to)])?;
        let items: Vec<DividendItem> = get_json(&self.source, &url).await?;
        let events: Vec<DividendEvent> = items.into_iter().filter_map(|i| i.into_event("")).collect();
        info!(from = %from, to = %to, events = events.len(), "fmp dividend calendar");
        Ok(events)
    }

    pub async fn profile(&self, symbol: &str) -> Result<EtfMetadata, ApiError> {
        self.limiter.acquire().await;
        let url = self.url(&format!("profile/{symbol}"), &[])?;
        let profiles: Vec<Profile> = get_json(&self.source, &url).await?;
        let p = profiles.into_iter().next().ok_or_else(|| ApiError::NoData(symbol.to_string()))?;
        Ok(EtfMetadata {
            symbol: if p.symbol.is_empty() { symbol.to_string() } else { p.symbol },
            name: p.company_name,
            description: p.description,
            exchange: p.exchange,
            currency: p.currency,
            country: p.country,
            sector: p.sector,
            industry: p.industry,
            beta: p.beta.map(|b| b.to_string()).unwrap_or_default(),
            last_updated: Some(Utc::now()),
            source: SOURCE_NAME.to_string(),
            ..EtfMetadata::default()
        })
    }
}

/// Keep only events for the given fund-family symbols.
pub fn filter_symbols(events: Vec<DividendEvent>, symbols: &[&str]) -> Vec<DividendEvent> {
    let keep: HashSet<&str> = symbols.iter().copied().collect();
    events.into_iter().filter(|e| keep.contains(e.symbol.as_str())).collect()
}

pub fn enrich_with_groups(events: &mut [DividendEvent], mapping: &GroupMap) {
    for ev in events.iter_mut() {
        let group = mapping.group_for(&ev.symbol);
        ev.group = Some(group);
        ev.frequency = Some(default_frequency(group));
    }
}
