pub mod alpha_vantage;
pub mod fmp;
pub mod limiter;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

use crate::scrape::fetch::{FetchError, PageSource, Retryable, status_is_retryable};

pub use alpha_vantage::AlphaVantageClient;
pub use fmp::FmpClient;
pub use limiter::RateLimiter;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} is not set")]
    MissingApiKey(&'static str),
    #[error("http error: {0}")]
    Http(String),
    #[error("request timed out")]
    Timeout,
    #[error("api returned status {0}")]
    Status(StatusCode),
    #[error("decode error: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("no data returned for {0}")]
    NoData(String),
}

impl Retryable for ApiError {
    fn is_retryable(&self) -> bool {
        match self {
            ApiError::Timeout | ApiError::Http(_) => true,
            ApiError::Status(status) => status_is_retryable(*status),
            ApiError::MissingApiKey(_) | ApiError::Decode(_) | ApiError::NoData(_) => false,
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Timeout => ApiError::Timeout,
            FetchError::Status(status) => ApiError::Status(status),
            other => ApiError::Http(other.to_string()),
        }
    }
}

/// GET through the page source (which owns retries) and decode the JSON body.
pub(crate) async fn get_json<S, T>(source: &S, url: &str) -> Result<T, ApiError>
where
    S: PageSource + ?Sized,
    T: DeserializeOwned,
{
    let body = source.get_text(url).await?;
    Ok(serde_json::from_str(&body)?)
}

/// JSON `null` decodes to the field's default, same as a missing key.
pub(crate) fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

/// Provider number-as-string: null, "None" and "-" all mean no value.
pub(crate) fn provider_value<'de, D: Deserializer<'de>>(d: D) -> Result<String, D::Error> {
    let raw: Option<String> = Option::deserialize(d)?;
    Ok(raw
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty() && s != "None" && s != "-")
        .unwrap_or_default())
}

pub(crate) fn require_key(key: &Option<String>, var: &'static str) -> Result<String, ApiError> {
    key.clone().filter(|k| !k.is_empty()).ok_or(ApiError::MissingApiKey(var))
}
