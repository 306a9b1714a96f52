use chrono::Utc;
use serde::Deserialize;
use tracing::{info, warn};
use url::Url;

use super::{ApiError, RateLimiter, get_json, provider_value, require_key};
use crate::config::AppConfig;
use crate::etf::EtfMetadata;
use crate::scrape::fetch::PageSource;

pub const SOURCE_NAME: &str = "Alpha Vantage";
const CONNECTION_SYMBOL: &str = "SPY";

/// OVERVIEW response. Every value arrives as a string; missing fields default to "".
/// Numeric fields also collapse the provider's "None" and "-" placeholders to "".
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Overview {
    symbol: String,
    asset_type: String,
    name: String,
    description: String,
    exchange: String,
    currency: String,
    country: String,
    sector: String,
    industry: String,
    fiscal_year_end: String,
    #[serde(deserialize_with = "provider_value")]
    market_capitalization: String,
    #[serde(deserialize_with = "provider_value")]
    dividend_per_share: String,
    #[serde(deserialize_with = "provider_value")]
    dividend_yield: String,
    #[serde(deserialize_with = "provider_value")]
    dividend_date: String,
    #[serde(deserialize_with = "provider_value")]
    ex_dividend_date: String,
    #[serde(deserialize_with = "provider_value")]
    beta: String,
    #[serde(rename = "PERatio", deserialize_with = "provider_value")]
    pe_ratio: String,
    #[serde(deserialize_with = "provider_value")]
    book_value: String,
    #[serde(rename = "EPS", deserialize_with = "provider_value")]
    eps: String,
    #[serde(deserialize_with = "provider_value")]
    profit_margin: String,
    #[serde(rename = "OperatingMarginTTM", deserialize_with = "provider_value")]
    operating_margin: String,
    #[serde(rename = "ReturnOnAssetsTTM", deserialize_with = "provider_value")]
    return_on_assets: String,
    #[serde(rename = "ReturnOnEquityTTM", deserialize_with = "provider_value")]
    return_on_equity: String,
    #[serde(rename = "52WeekHigh", deserialize_with = "provider_value")]
    week52_high: String,
    #[serde(rename = "52WeekLow", deserialize_with = "provider_value")]
    week52_low: String,
    #[serde(rename = "50DayMovingAverage", deserialize_with = "provider_value")]
    day50_moving_average: String,
    #[serde(rename = "200DayMovingAverage", deserialize_with = "provider_value")]
    day200_moving_average: String,
    #[serde(deserialize_with = "provider_value")]
    shares_outstanding: String,
}

impl From<Overview> for EtfMetadata {
    fn from(o: Overview) -> Self {
        EtfMetadata {
            symbol: o.symbol,
            name: o.name,
            description: o.description,
            exchange: o.exchange,
            currency: o.currency,
            country: o.country,
            sector: o.sector,
            industry: o.industry,
            asset_type: o.asset_type,
            market_cap: o.market_capitalization,
            dividend_per_share: o.dividend_per_share,
            dividend_yield: o.dividend_yield,
            dividend_date: o.dividend_date,
            ex_dividend_date: o.ex_dividend_date,
            beta: o.beta,
            week52_high: o.week52_high,
            week52_low: o.week52_low,
            day50_moving_average: o.day50_moving_average,
            day200_moving_average: o.day200_moving_average,
            shares_outstanding: o.shares_outstanding,
            fiscal_year_end: o.fiscal_year_end,
            pe_ratio: o.pe_ratio,
            book_value: o.book_value,
            eps: o.eps,
            profit_margin: o.profit_margin,
            operating_margin: o.operating_margin,
            return_on_assets: o.return_on_assets,
            return_on_equity: o.return_on_equity,
            last_updated: Some(Utc::now()),
            source: SOURCE_NAME.to_string(),
        }
    }
}

pub struct AlphaVantageClient<S> {
    source: S,
    api_key: String,
    base_url: String,
    limiter: RateLimiter,
}

impl<S: PageSource> AlphaVantageClient<S> {
    pub fn new(source: S, cfg: &AppConfig) -> Result<Self, ApiError> {
        Ok(Self {
            source,
            api_key: require_key(&cfg.alpha_vantage_key, "ALPHA_VANTAGE_API_KEY")?,
            base_url: cfg.alpha_vantage_url.clone(),
            limiter: RateLimiter::alpha_vantage(),
        })
    }

    pub fn with_limiter(mut self, limiter: RateLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    fn overview_url(&self, symbol: &str) -> Result<String, ApiError> {
        let url = Url::parse_with_params(
            &self.base_url,
            &[("function", "OVERVIEW"), ("symbol", symbol), ("apikey", self.api_key.as_str())],
        )
        .map_err(|e| ApiError::Http(e.to_string()))?;
        Ok(url.into())
    }

    pub async fn overview(&self, symbol: &str) -> Result<EtfMetadata, ApiError> {
        self.limiter.acquire().await;
        let url = self.overview_url(symbol)?;
        let overview: Overview = get_json(&self.source, &url).await?;
        // An empty body ({}), an unknown symbol and a spent quota all come back without Symbol.
        if overview.symbol.is_empty() {
            return Err(ApiError::NoData(symbol.to_string()));
        }
        Ok(overview.into())
    }

    /// Looks up a symbol that always has an overview. A bad key or a spent quota fails here.
    pub async fn test_connection(&self) -> Result<(), ApiError> {
        self.overview(CONNECTION_SYMBOL).await.map(|_| ())
    }

    /// Sequential; failures are logged and skipped.
    pub async fn overviews(&self, symbols: &[String]) -> Vec<EtfMetadata> {
        let mut out = Vec::with_capacity(symbols.len());
        for (i, symbol) in symbols.iter().enumerate() {
            match self.overview(symbol).await {
                Ok(meta) => {
                    info!(symbol = %symbol, name = %meta.name, progress = %format!("{}/{}", i + 1, symbols.len()), "overview");
                    out.push(meta);
                }
                Err(e) => warn!(symbol = %symbol, error = %e, "overview failed; skipping"),
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrape::fetch::MockSource;

    fn cfg() -> AppConfig {
        AppConfig { alpha_vantage_key: Some("KEY".into()), alpha_vantage_url: "https://av.test/query".into(), ..AppConfig::default() }
    }

    const TSLY: &str = r#"{
        "Symbol": "TSLY", "AssetType": "ETF", "Name": "YieldMax TSLA Option Income Strategy ETF",
        "Description": "TSLY seeks current income.", "Exchange": "NYSE ARCA", "Currency": "USD",
        "Country": "USA", "DividendYield": "0.712", "52WeekHigh": "25.10", "50DayMovingAverage": "9.85",
        "Beta": "None", "FiscalYearEnd": "October", "PERatio": "-", "EPS": "None", "BookValue": "12.4",
        "ProfitMargin": "0.05", "OperatingMarginTTM": "0.07", "ReturnOnAssetsTTM": "0.01", "ReturnOnEquityTTM": "0.11"
    }"#;

    #[test]
    fn missing_key_is_an_error() {
        let err = AlphaVantageClient::new(MockSource::new(), &AppConfig::default()).err().unwrap();
        assert!(matches!(err, ApiError::MissingApiKey("ALPHA_VANTAGE_API_KEY")));
    }

    #[tokio::test]
    async fn overview_maps_fields() {
        let url = "https://av.test/query?function=OVERVIEW&symbol=TSLY&apikey=KEY";
        let client = AlphaVantageClient::new(MockSource::new().with_page(url, TSLY), &cfg())
            .unwrap()
            .with_limiter(RateLimiter::unlimited());
        let meta = client.overview("TSLY").await.unwrap();
        assert_eq!(meta.symbol, "TSLY");
        assert_eq!(meta.asset_type, "ETF");
        assert_eq!(meta.week52_high, "25.10");
        assert_eq!(meta.day50_moving_average, "9.85");
        assert_eq!(meta.dividend_yield, "0.712");
        assert_eq!(meta.industry, "");
        assert_eq!(meta.beta, "");
        assert_eq!(meta.fiscal_year_end, "October");
        assert_eq!(meta.pe_ratio, "");
        assert_eq!(meta.eps, "");
        assert_eq!(meta.book_value, "12.4");
        assert_eq!(meta.profit_margin, "0.05");
        assert_eq!(meta.operating_margin, "0.07");
        assert_eq!(meta.return_on_assets, "0.01");
        assert_eq!(meta.return_on_equity, "0.11");
        assert_eq!(meta.source, SOURCE_NAME);
        assert!(meta.last_updated.is_some());
    }

    #[tokio::test]
    async fn empty_symbol_is_no_data_and_batch_skips_it() {
        let src = MockSource::new()
            .with_page("https://av.test/query?function=OVERVIEW&symbol=TSLY&apikey=KEY", TSLY)
            .with_page(
                "https://av.test/query?function=OVERVIEW&symbol=ZZZZ&apikey=KEY",
                r#"{"Information": "rate limit"}"#,
            );
        let client = AlphaVantageClient::new(src, &cfg()).unwrap().with_limiter(RateLimiter::unlimited());
        assert!(matches!(client.overview("ZZZZ").await, Err(ApiError::NoData(s)) if s == "ZZZZ"));

        let all = client.overviews(&["ZZZZ".to_string(), "TSLY".to_string(), "NOPE".to_string()]).await;
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].symbol, "TSLY");
    }

    #[tokio::test]
    async fn connection_check_reports_quota_errors() {
        let spy = "https://av.test/query?function=OVERVIEW&symbol=SPY&apikey=KEY";
        let ok = AlphaVantageClient::new(MockSource::new().with_page(spy, r#"{"Symbol": "SPY"}"#), &cfg())
            .unwrap()
            .with_limiter(RateLimiter::unlimited());
        ok.test_connection().await.unwrap();

        let spent = AlphaVantageClient::new(MockSource::new().with_page(spy, r#"{"Note": "call frequency"}"#), &cfg())
            .unwrap()
            .with_limiter(RateLimiter::unlimited());
        assert!(matches!(spent.test_connection().await, Err(ApiError::NoData(s)) if s == "SPY"));
    }
}
