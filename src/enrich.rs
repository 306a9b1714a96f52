use std::collections::BTreeMap;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;

use crate::api::AlphaVantageClient;
use crate::cli::RunArgs;
use crate::config::AppConfig;
use crate::etf::{Etf, EtfMetadata, GroupMap};
use crate::etfs::build_etfs;
use crate::scrape::fetch::{HttpSource, PageSource};
use crate::store::{self, ETFS_ENRICHED_FILE, ETFS_FILE, METADATA_FILE};
use crate::telemetry::{self, config::json_mode};
use crate::telemetry::ops::enrich::Phase as EnrichPhase;
use crate::util::time::today;

/// Funds enriched first, in this order.
pub const PRIORITY: &[&str] = &[
    "TSLY", "NVDY", "MSTY", "OARK", "QQLY", "APLY", "CONY", "YMAX",
    "BIGY", "SOXY", "AMZY", "GDXY", "TSMY", "PLTY", "YMAG",
];

#[derive(Args)]
pub struct EnrichCmd {
    /// How many funds to look up
    #[arg(long, default_value_t = 15)] pub count: usize,
    #[command(flatten)] pub run: RunArgs,
}

#[derive(Serialize)]
struct EnrichPlan { count: usize, symbols: Vec<String>, outputs: Vec<String> }

#[derive(Serialize, Debug)]
pub struct EnrichApply { pub requested: usize, pub enriched: usize, pub symbols: Vec<String> }

/// Priority symbols present in `etfs` first, then the rest in list order, capped at `n`.
pub fn select_priority(etfs: &[Etf], n: usize) -> Vec<String> {
    let mut out: Vec<String> = PRIORITY
        .iter()
        .filter(|p| etfs.iter().any(|e| e.symbol == **p))
        .map(|p| p.to_string())
        .collect();
    for e in etfs {
        if !out.contains(&e.symbol) { out.push(e.symbol.clone()); }
    }
    out.truncate(n);
    out
}

/// A longer description replaces ours; a different non-empty name replaces ours.
pub fn merge_metadata(etf: &mut Etf, meta: &EtfMetadata) {
    if meta.description.len() > etf.description.len() {
        etf.description = meta.description.clone();
    }
    if !meta.name.is_empty() && meta.name != etf.name {
        etf.name = meta.name.clone();
    }
}

fn load_etfs(cfg: &AppConfig, today: NaiveDate) -> Result<Vec<Etf>> {
    Ok(store::read_json(&cfg.out_dir.join(ETFS_FILE))?
        .unwrap_or_else(|| build_etfs(&GroupMap::builtin(), None, today)))
}

pub async fn execute<S: PageSource>(
    client: &AlphaVantageClient<S>,
    cfg: &AppConfig,
    count: usize,
    today: NaiveDate,
) -> Result<EnrichApply> {
    let log = telemetry::enrich();
    {
        let _s = log.span(&EnrichPhase::Connect).entered();
        client.test_connection().await.context("alpha vantage connection check failed")?;
    }
    let mut etfs = load_etfs(cfg, today)?;
    let symbols = { let _s = log.span(&EnrichPhase::Select).entered(); select_priority(&etfs, count) };

    let metadata: BTreeMap<String, EtfMetadata> = {
        let _s = log.span_kv(&EnrichPhase::Overview, [("symbols", symbols.len().to_string())]).entered();
        client.overviews(&symbols).await.into_iter().map(|m| (m.symbol.clone(), m)).collect()
    };

    {
        let _s = log.span(&EnrichPhase::Merge).entered();
        for etf in &mut etfs {
            if let Some(meta) = metadata.get(&etf.symbol) { merge_metadata(etf, meta); }
        }
    }

    {
        let _s = log.span(&EnrichPhase::Write).entered();
        store::write_json(&cfg.out_dir.join(METADATA_FILE), &metadata)?;
        store::write_json(&cfg.out_dir.join(ETFS_ENRICHED_FILE), &etfs)?;
    }
    Ok(EnrichApply { requested: symbols.len(), enriched: metadata.len(), symbols: metadata.into_keys().collect() })
}

pub async fn run(cfg: &AppConfig, args: EnrichCmd) -> Result<()> {
    let log = telemetry::enrich();
    let _g = log.root_span_kv([
        ("apply", args.run.apply.to_string()),
        ("count", args.count.to_string()),
    ]).entered();

    if !args.run.apply {
        let symbols = select_priority(&load_etfs(cfg, today())?, args.count);
        let outputs = [METADATA_FILE, ETFS_ENRICHED_FILE]
            .iter()
            .map(|f| cfg.out_dir.join(f).display().to_string())
            .collect::<Vec<_>>();
        if json_mode() {
            log.plan(&EnrichPlan { count: symbols.len(), symbols: symbols.into_iter().take(args.run.plan_limit).collect(), outputs })?;
        } else {
            log.info(format!("📝 Enrich plan — overviews={} outputs={}", symbols.len(), outputs.join(",")));
            for s in symbols.iter().take(args.run.plan_limit) { log.info(format!("  {}", s)); }
            if symbols.len() > args.run.plan_limit { log.info(format!("  ... ({} more)", symbols.len() - args.run.plan_limit)); }
            if cfg.alpha_vantage_key.is_none() { log.warn("   ALPHA_VANTAGE_API_KEY is not set; --apply will fail."); }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let client = AlphaVantageClient::new(HttpSource::new(cfg)?, cfg)?;
    let result = execute(&client, cfg, args.count, today()).await?;
    log.totals(result.enriched, result.requested - result.enriched, 2);
    log.result(&result, &cfg.out_dir.display().to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::RateLimiter;
    use crate::etf::{Frequency, Group};
    use crate::scrape::fetch::MockSource;

    const SPY: &str = "https://av.test/query?function=OVERVIEW&symbol=SPY&apikey=KEY";

    fn etf(symbol: &str) -> Etf {
        Etf {
            symbol: symbol.into(),
            name: format!("YieldMax {symbol} Option Income Strategy ETF"),
            group: Group::GroupA,
            frequency: Frequency::Monthly,
            description: "short".into(),
            next_ex_date: None,
            next_pay_date: None,
        }
    }

    #[test]
    fn priority_first_then_the_rest() {
        let etfs: Vec<Etf> = ["ABNY", "CONY", "AFRM", "TSLY"].iter().map(|s| etf(s)).collect();
        assert_eq!(select_priority(&etfs, 3), vec!["TSLY", "CONY", "ABNY"]);
        assert_eq!(select_priority(&etfs, 10).len(), 4);
    }

    #[test]
    fn merge_prefers_longer_description_and_new_name() {
        let mut e = etf("TSLY");
        let meta = EtfMetadata { name: "TSLY Income ETF".into(), description: "x".into(), ..Default::default() };
        merge_metadata(&mut e, &meta);
        assert_eq!(e.name, "TSLY Income ETF");
        assert_eq!(e.description, "short");

        let meta = EtfMetadata { description: "a much longer description".into(), ..Default::default() };
        merge_metadata(&mut e, &meta);
        assert_eq!(e.name, "TSLY Income ETF");
        assert_eq!(e.description, "a much longer description");
    }

    #[tokio::test]
    async fn writes_metadata_and_enriched_list() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().to_path_buf();
        let cfg = AppConfig {
            out_dir: out.clone(),
            alpha_vantage_key: Some("KEY".into()),
            alpha_vantage_url: "https://av.test/query".into(),
            ..AppConfig::default()
        };
        store::write_json(&out.join(ETFS_FILE), &vec![etf("CONY"), etf("TSLY")]).unwrap();
        let src = MockSource::new()
            .with_page(SPY, r#"{"Symbol": "SPY"}"#)
            .with_page(
                "https://av.test/query?function=OVERVIEW&symbol=TSLY&apikey=KEY",
                r#"{"Symbol": "TSLY", "Name": "YieldMax TSLA Option Income Strategy ETF", "Description": "TSLY seeks current income.",
                    "FiscalYearEnd": "October", "PERatio": "None", "EPS": "-", "BookValue": "4.2",
                    "ProfitMargin": "0.0", "OperatingMarginTTM": "0.12", "ReturnOnAssetsTTM": "0.03", "ReturnOnEquityTTM": "0.09"}"#,
            );
        let client = AlphaVantageClient::new(src, &cfg).unwrap().with_limiter(RateLimiter::unlimited());

        let result = execute(&client, &cfg, 5, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()).await.unwrap();
        assert_eq!(result.requested, 2);
        assert_eq!(result.enriched, 1);

        let meta: BTreeMap<String, EtfMetadata> = store::read_json(&out.join(METADATA_FILE)).unwrap().unwrap();
        let tsly = &meta["TSLY"];
        assert_eq!(tsly.source, "Alpha Vantage");
        assert_eq!(tsly.fiscal_year_end, "October");
        assert_eq!(tsly.pe_ratio, "");
        assert_eq!(tsly.eps, "");
        assert_eq!(tsly.profit_margin, "0.0");
        assert_eq!(tsly.operating_margin, "0.12");
        assert_eq!(tsly.return_on_assets, "0.03");
        assert_eq!(tsly.return_on_equity, "0.09");
        let raw = std::fs::read_to_string(out.join(METADATA_FILE)).unwrap();
        assert!(raw.contains("\"peRatio\""));
        assert!(raw.contains("\"returnOnEquity\": \"0.09\""));
        let enriched: Vec<Etf> = store::read_json(&out.join(ETFS_ENRICHED_FILE)).unwrap().unwrap();
        assert_eq!(enriched[1].description, "TSLY seeks current income.");
        assert_eq!(enriched[0].description, "short");
    }

    #[tokio::test]
    async fn failed_connection_stops_before_any_write() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AppConfig {
            out_dir: tmp.path().to_path_buf(),
            alpha_vantage_key: Some("KEY".into()),
            alpha_vantage_url: "https://av.test/query".into(),
            ..AppConfig::default()
        };
        let src = MockSource::new().with_page(SPY, r#"{"Error Message": "Invalid API call."}"#);
        let client = AlphaVantageClient::new(src, &cfg).unwrap().with_limiter(RateLimiter::unlimited());

        let err = execute(&client, &cfg, 5, NaiveDate::from_ymd_opt(2025, 3, 10).unwrap()).await.unwrap_err();
        assert!(err.to_string().contains("connection check"));
        assert!(!cfg.out_dir.join(METADATA_FILE).exists());
        assert!(!cfg.out_dir.join(ETFS_ENRICHED_FILE).exists());
    }
}
