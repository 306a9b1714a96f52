use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_BASE_URL: &str = "https://www.yieldmaxetfs.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 2;
const DEFAULT_RETRY_DELAY_MS: u64 = 2_000;
const DEFAULT_REQUEST_DELAY_MS: u64 = 1_000;
const DEFAULT_OUT_DIR: &str = "data";
pub const DEFAULT_ALPHA_VANTAGE_URL: &str = "https://www.alphavantage.co/query";
pub const DEFAULT_FMP_URL: &str = "https://financialmodelingprep.com/api/v3";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub retries: u32,
    pub retry_delay: Duration,
    /// Pause between consecutive page fetches in a batch.
    pub request_delay: Duration,
    pub out_dir: PathBuf,
    pub alpha_vantage_key: Option<String>,
    pub alpha_vantage_url: String,
    pub fmp_key: Option<String>,
    pub fmp_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retries: DEFAULT_RETRIES,
            retry_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            request_delay: Duration::from_millis(DEFAULT_REQUEST_DELAY_MS),
            out_dir: PathBuf::from(DEFAULT_OUT_DIR),
            alpha_vantage_key: None,
            alpha_vantage_url: DEFAULT_ALPHA_VANTAGE_URL.to_string(),
            fmp_key: None,
            fmp_url: DEFAULT_FMP_URL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
        let mut cfg = Self::default();
        if let Some(v) = get("DIVMINDER_BASE_URL") { cfg.base_url = v; }
        if let Some(v) = get("DIVMINDER_USER_AGENT") { cfg.user_agent = v; }
        if let Some(v) = get("DIVMINDER_TIMEOUT_SECS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.timeout = Duration::from_secs(v);
        }
        if let Some(v) = get("DIVMINDER_RETRIES").and_then(|v| v.parse::<u32>().ok()) {
            cfg.retries = v;
        }
        if let Some(v) = get("DIVMINDER_RETRY_DELAY_MS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.retry_delay = Duration::from_millis(v);
        }
        if let Some(v) = get("DIVMINDER_REQUEST_DELAY_MS").and_then(|v| v.parse::<u64>().ok()) {
            cfg.request_delay = Duration::from_millis(v);
        }
        if let Some(v) = get("DIVMINDER_OUT_DIR") { cfg.out_dir = PathBuf::from(v); }
        // "demo" is Alpha Vantage's public placeholder key; treat it as unset
        cfg.alpha_vantage_key = get("ALPHA_VANTAGE_API_KEY").filter(|k| !k.is_empty() && k != "demo");
        if let Some(v) = get("ALPHA_VANTAGE_BASE_URL") { cfg.alpha_vantage_url = v; }
        cfg.fmp_key = get("FMP_API_KEY").filter(|k| !k.is_empty());
        if let Some(v) = get("FMP_BASE_URL") { cfg.fmp_url = v; }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |k| map.get(k).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let cfg = AppConfig::from_lookup(lookup(&[]));
        assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
        assert_eq!(cfg.retries, DEFAULT_RETRIES);
        assert_eq!(cfg.out_dir, PathBuf::from("data"));
        assert!(cfg.alpha_vantage_key.is_none());
    }

    #[test]
    fn overrides_and_ignores_unparsable_numbers() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("DIVMINDER_TIMEOUT_SECS", "5"),
            ("DIVMINDER_RETRIES", "many"),
            ("DIVMINDER_OUT_DIR", "/tmp/out"),
            ("FMP_API_KEY", "k"),
        ]));
        assert_eq!(cfg.timeout, Duration::from_secs(5));
        assert_eq!(cfg.retries, DEFAULT_RETRIES);
        assert_eq!(cfg.out_dir, PathBuf::from("/tmp/out"));
        assert_eq!(cfg.fmp_key.as_deref(), Some("k"));
    }

    #[test]
    fn demo_key_counts_as_absent() {
        let cfg = AppConfig::from_lookup(lookup(&[("ALPHA_VANTAGE_API_KEY", "demo")]));
        assert!(cfg.alpha_vantage_key.is_none());
        let cfg = AppConfig::from_lookup(lookup(&[("ALPHA_VANTAGE_API_KEY", "abc")]));
        assert_eq!(cfg.alpha_vantage_key.as_deref(), Some("abc"));
    }
}
