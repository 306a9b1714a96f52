// On-disk layout of the static JSON API.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::etf::DividendHistory;

pub const SCHEDULE_FILE: &str = "schedule.json";
pub const ETFS_FILE: &str = "etfs.json";
pub const ETFS_ENRICHED_FILE: &str = "etfs_enriched.json";
pub const METADATA_FILE: &str = "etf_metadata.json";
pub const ETF_SUMMARY_FILE: &str = "etf_summary.json";
pub const API_SUMMARY_FILE: &str = "api_summary.json";
pub const FMP_CALENDAR_FILE: &str = "fmp_calendar.json";
pub const FMP_PROFILES_FILE: &str = "fmp_profiles.json";
pub const HISTORY_DIR: &str = "dividends";
const HISTORY_SUFFIX: &str = "_dividend_history.json";

pub fn history_path(out_dir: &Path, symbol: &str) -> PathBuf {
    out_dir.join(HISTORY_DIR).join(format!("{}{}", symbol.to_ascii_uppercase(), HISTORY_SUFFIX))
}

pub fn fmp_history_path(out_dir: &Path, symbol: &str) -> PathBuf {
    out_dir.join(format!("fmp_dividends_{}.json", symbol.to_ascii_uppercase()))
}

/// Pretty-printed (2-space) JSON; parent directories are created.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {:?}", parent))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Failed to write {:?}", path))?;
    Ok(())
}

/// `Ok(None)` when the file does not exist.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    let value = serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))?;
    Ok(Some(value))
}

/// Every parsable history file under `<out>/dividends`, sorted by symbol.
/// Unreadable files are skipped.
pub fn load_histories(out_dir: &Path) -> Result<Vec<DividendHistory>> {
    let dir = out_dir.join(HISTORY_DIR);
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut out = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        let is_history = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(HISTORY_SUFFIX));
        if !is_history { continue; }
        match read_json::<DividendHistory>(&path) {
            Ok(Some(h)) => out.push(h),
            Ok(None) => {}
            Err(e) => tracing::warn!(path = ?path, error = %e, "skipping unreadable history"),
        }
    }
    out.sort_by(|a, b| a.symbol.cmp(&b.symbol));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etf::{DividendStats, Frequency, Group};
    use chrono::Utc;

    fn history(symbol: &str) -> DividendHistory {
        DividendHistory {
            symbol: symbol.into(),
            name: format!("YieldMax {symbol}"),
            group: Group::GroupA,
            frequency: Frequency::Monthly,
            current_yield: None,
            current_price: None,
            events: vec![],
            stats: DividendStats::default(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn paths() {
        let out = Path::new("data");
        assert_eq!(history_path(out, "cony"), PathBuf::from("data/dividends/CONY_dividend_history.json"));
        assert_eq!(fmp_history_path(out, "tsly"), PathBuf::from("data/fmp_dividends_TSLY.json"));
    }

    #[test]
    fn write_creates_dirs_and_pretty_prints() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        let path = dir.join("nested").join("x.json");
        write_json(&path, &serde_json::json!({"a": 1})).unwrap();
        let s = fs::read_to_string(&path).unwrap();
        assert_eq!(s, "{\n  \"a\": 1\n}");
        assert!(read_json::<serde_json::Value>(&dir.join("missing.json")).unwrap().is_none());
    }

    #[test]
    fn load_histories_skips_other_and_broken_files() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().to_path_buf();
        write_json(&history_path(&dir, "TSLY"), &history("TSLY")).unwrap();
        write_json(&history_path(&dir, "CONY"), &history("CONY")).unwrap();
        fs::write(dir.join(HISTORY_DIR).join("BAD_dividend_history.json"), "{not json").unwrap();
        fs::write(dir.join(HISTORY_DIR).join("notes.txt"), "hi").unwrap();

        let all = load_histories(&dir).unwrap();
        let syms: Vec<_> = all.iter().map(|h| h.symbol.as_str()).collect();
        assert_eq!(syms, vec!["CONY", "TSLY"]);
        assert!(load_histories(&dir.join("nowhere")).unwrap().is_empty());
    }
}
