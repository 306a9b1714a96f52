use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use thiserror::Error;
use tracing::warn;

use crate::config::AppConfig;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[source] reqwest::Error),
    #[error("request timed out")]
    Timeout,
    #[error("unexpected status {0}")]
    Status(StatusCode),
    #[error("decode error: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("no mock page for {0}")]
    MockMissing(String),
}

impl FetchError {
    fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() || err.is_body() {
            FetchError::Decode(err)
        } else {
            FetchError::Http(err)
        }
    }
}

/// Failures worth another attempt: timeouts, transport errors, 429 and 5xx.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

pub fn status_is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout | FetchError::Http(_) => true,
            FetchError::Status(status) => status_is_retryable(*status),
            FetchError::Decode(_) | FetchError::MockMissing(_) => false,
        }
    }
}

/// Run `op` up to `retries + 1` times, sleeping `delay` between attempts,
/// as long as the failure is retryable.
pub async fn with_retries<T, E, F, Fut>(what: &str, retries: u32, delay: Duration, mut op: F) -> Result<T, E>
where
    E: Retryable + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(e) if e.is_retryable() && attempt < retries => {
                attempt += 1;
                warn!(url = what, attempt, error = %e, "retrying");
                if !delay.is_zero() { tokio::time::sleep(delay).await; }
            }
            Err(e) => return Err(e),
        }
    }
}

pub fn schedule_url(base: &str) -> String {
    format!("{}/distribution-schedule/", base.trim_end_matches('/'))
}

pub fn etf_url(base: &str, symbol: &str) -> String {
    format!("{}/our-etfs/{}/", base.trim_end_matches('/'), symbol.trim().to_ascii_lowercase())
}

#[async_trait]
pub trait PageSource: Send + Sync {
    async fn get_text(&self, url: &str) -> Result<String, FetchError>;
}

#[derive(Clone)]
pub struct HttpSource {
    http: HttpClient,
    retries: u32,
    retry_delay: Duration,
}

impl HttpSource {
    pub fn new(cfg: &AppConfig) -> Result<Self, FetchError> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .user_agent(cfg.user_agent.clone())
            .build()
            .map_err(FetchError::Http)?;
        Ok(Self { http, retries: cfg.retries, retry_delay: cfg.retry_delay })
    }

    async fn get_once(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.http.get(url).send().await.map_err(FetchError::from_reqwest)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }
        resp.text().await.map_err(FetchError::from_reqwest)
    }
}

#[async_trait]
impl PageSource for HttpSource {
    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        with_retries(url, self.retries, self.retry_delay, || self.get_once(url)).await
    }
}

#[cfg(test)]
pub use mock::MockSource;

#[cfg(test)]
mod mock {
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    use super::*;

    /// Canned pages keyed by URL. Queued failures for a URL are returned before its page.
    #[derive(Debug, Default)]
    pub struct MockSource {
        pages: Mutex<HashMap<String, String>>,
        failures: Mutex<HashMap<String, VecDeque<FetchError>>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockSource {
        pub fn new() -> Self { Self::default() }

        pub fn with_page(self, url: impl Into<String>, body: impl Into<String>) -> Self {
            self.pages.lock().unwrap().insert(url.into(), body.into());
            self
        }

        pub fn push_failure(&self, url: impl Into<String>, err: FetchError) {
            self.failures.lock().unwrap().entry(url.into()).or_default().push_back(err);
        }

        pub fn calls(&self) -> Vec<String> { self.calls.lock().unwrap().clone() }
    }

    #[async_trait]
    impl PageSource for MockSource {
        async fn get_text(&self, url: &str) -> Result<String, FetchError> {
            self.calls.lock().unwrap().push(url.to_string());
            if let Some(err) = self.failures.lock().unwrap().get_mut(url).and_then(VecDeque::pop_front) {
                return Err(err);
            }
            self.pages
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::MockMissing(url.to_string()))
        }
    }
}
