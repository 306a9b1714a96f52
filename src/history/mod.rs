use std::time::Duration;

use anyhow::{Result, bail};
use chrono::{NaiveDate, Utc};
use clap::Args;

use crate::cli::{RunArgs, normalize_symbols};
use crate::config::AppConfig;
use crate::etf::{
    DividendHistory, Etf, GroupMap, compute_stats, default_frequency, display_name, estimate_next,
};
use crate::scrape::fetch::{HttpSource, PageSource, etf_url};
use crate::scrape::parse_detail_page;
use crate::store::{self, ETF_SUMMARY_FILE};
use crate::telemetry::{self, config::json_mode};
use crate::telemetry::ops::history::Phase as HistoryPhase;
use crate::util::time::today;

pub mod types;

use types::{EtfSummary, HistoryApply, SymbolOutcome};

#[derive(Args)]
pub struct HistoryCmd {
    /// Symbols to refresh (repeatable or comma-separated); defaults to every known fund
    #[arg(long = "symbol")] pub symbols: Vec<String>,
    #[arg(long)] pub limit: Option<usize>,
    /// Pause between fund pages; defaults to DIVMINDER_REQUEST_DELAY_MS
    #[arg(long)] pub delay_ms: Option<u64>,
    #[command(flatten)] pub run: RunArgs,
}

fn resolve_symbols(args: &HistoryCmd, mapping: &GroupMap) -> Result<Vec<String>> {
    let mut symbols = if args.symbols.is_empty() {
        mapping.symbols().into_iter().map(str::to_string).collect()
    } else {
        normalize_symbols(&args.symbols)?
    };
    if let Some(n) = args.limit { symbols.truncate(n); }
    Ok(symbols)
}

/// Scrape one fund page into a history file. Pages without a parsable
/// distribution table are an error so an earlier good file is not overwritten.
pub async fn refresh_symbol<S: PageSource + ?Sized>(
    source: &S,
    cfg: &AppConfig,
    mapping: &GroupMap,
    symbol: &str,
    today: NaiveDate,
) -> Result<DividendHistory> {
    let log = telemetry::history();
    let url = etf_url(&cfg.base_url, symbol);
    let html = { let _s = log.span_kv(&HistoryPhase::Fetch, [("url", url.clone())]).entered(); source.get_text(&url).await? };
    let detail = { let _s = log.span(&HistoryPhase::Parse).entered(); parse_detail_page(&html, symbol, today) };
    if detail.history.is_empty() {
        bail!("no distribution rows on {}", url);
    }

    let group = mapping.group_for(symbol);
    let frequency = detail.frequency.unwrap_or_else(|| default_frequency(group));
    let mut events = detail.history;
    for ev in &mut events {
        ev.group = Some(group);
        ev.frequency = Some(frequency);
    }
    let history = DividendHistory {
        symbol: detail.symbol,
        name: detail.name.unwrap_or_else(|| display_name(symbol, group)),
        group,
        frequency,
        current_yield: detail.current_yield,
        current_price: detail.current_price,
        stats: compute_stats(&events, today),
        events,
        updated_at: Utc::now(),
    };

    let path = store::history_path(&cfg.out_dir, symbol);
    let _s = log.span_kv(&HistoryPhase::Write, [("path", path.display().to_string())]).entered();
    store::write_json(&path, &history)?;
    Ok(history)
}

/// Summary row for a fund, with the next dates projected from its history.
pub fn summary_etf(history: &DividendHistory, today: NaiveDate) -> Etf {
    let next = estimate_next(history, today);
    Etf {
        symbol: history.symbol.clone(),
        name: history.name.clone(),
        group: history.group,
        frequency: history.frequency,
        description: format!("YieldMax {} ETF - {} dividend payments", history.symbol, history.frequency),
        next_ex_date: next.map(|(ex, _)| ex),
        next_pay_date: next.map(|(_, pay)| pay),
    }
}

/// Rebuild `etf_summary.json` from every history file on disk.
pub fn write_etf_summary(cfg: &AppConfig, today: NaiveDate) -> Result<EtfSummary> {
    let etfs: Vec<Etf> = store::load_histories(&cfg.out_dir)?
        .iter()
        .map(|h| summary_etf(h, today))
        .collect();
    let summary = EtfSummary { last_updated: Utc::now(), total_etfs: etfs.len(), etfs };
    store::write_json(&cfg.out_dir.join(ETF_SUMMARY_FILE), &summary)?;
    Ok(summary)
}

pub async fn execute<S: PageSource + ?Sized>(
    source: &S,
    cfg: &AppConfig,
    symbols: &[String],
    delay: Duration,
    today: NaiveDate,
) -> Result<HistoryApply> {
    let log = telemetry::history();
    let mapping = GroupMap::builtin();
    let mut per_symbol = Vec::with_capacity(symbols.len());

    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 && !delay.is_zero() { tokio::time::sleep(delay).await; }
        let _sym = log.span_kv(&HistoryPhase::Symbol, [("symbol", symbol.clone())]).entered();
        match refresh_symbol(source, cfg, &mapping, symbol, today).await {
            Ok(h) => {
                log.symbol_summary(symbol, h.events.len(), h.stats.last_amount);
                per_symbol.push(SymbolOutcome { symbol: symbol.clone(), events: h.events.len(), last_amount: h.stats.last_amount, error: None });
            }
            Err(e) => {
                log.warn_kv("⚠️ history failed", [("symbol", symbol.clone()), ("error", e.to_string())]);
                per_symbol.push(SymbolOutcome { symbol: symbol.clone(), events: 0, last_amount: 0.0, error: Some(e.to_string()) });
            }
        }
    }

    let summary = { let _s = log.span(&HistoryPhase::Summary).entered(); write_etf_summary(cfg, today)? };
    let failed = per_symbol.iter().filter(|o| o.error.is_some()).count();
    Ok(HistoryApply { ok: per_symbol.len() - failed, failed, per_symbol, summary_etfs: summary.total_etfs })
}

pub async fn run(cfg: &AppConfig, args: HistoryCmd) -> Result<()> {
    let log = telemetry::history();
    let _g = log.root_span_kv([
        ("apply", args.run.apply.to_string()),
        ("symbols", format!("{:?}", args.symbols)),
        ("limit", format!("{:?}", args.limit)),
        ("plan_limit", args.run.plan_limit.to_string()),
    ]).entered();

    let symbols = resolve_symbols(&args, &GroupMap::builtin())?;
    let delay = args.delay_ms.map(Duration::from_millis).unwrap_or(cfg.request_delay);

    if !args.run.apply {
        if json_mode() {
            use types::{HistoryPlan, SymbolSample};
            let samples = symbols.iter().take(args.run.plan_limit)
                .map(|s| SymbolSample { symbol: s.clone(), url: etf_url(&cfg.base_url, s) })
                .collect();
            let plan = HistoryPlan {
                symbols: symbols.len(),
                delay_ms: delay.as_millis() as u64,
                out_dir: cfg.out_dir.display().to_string(),
                sample_symbols: samples,
            };
            log.plan(&plan)?;
        } else {
            log.info(format!("📝 History plan — symbols={} delay_ms={} out={}", symbols.len(), delay.as_millis(), cfg.out_dir.display()));
            for s in symbols.iter().take(args.run.plan_limit) { log.info(format!("  {} {}", s, etf_url(&cfg.base_url, s))); }
            if symbols.len() > args.run.plan_limit { log.info(format!("  ... ({} more)", symbols.len() - args.run.plan_limit)); }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let source = HttpSource::new(cfg)?;
    let result = execute(&source, cfg, &symbols, delay, today()).await?;
    log.totals(result.ok, result.failed, result.ok + 1);
    log.result(&result, &cfg.out_dir.display().to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etf::{Frequency, Group};
    use crate::scrape::fetch::MockSource;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate { NaiveDate::from_ymd_opt(y, m, day).unwrap() }

    const FUND_PAGE: &str = r#"
        <html><body>
          <h2>YieldMax COIN Option Income Strategy ETF</h2>
          <p>Distributions are paid monthly.</p>
          <div><span>Distribution Rate</span><span>98.50%</span></div>
          <div class="key-metrics">
            <div class="metric-item"><span class="metric-label">Closing Price</span><span class="metric-value">$9.87</span></div>
          </div>
          <table class="wpDataTable">
            <thead><tr><th>Ex Date</th><th>Record Date</th><th>Payable Date</th><th>Amount</th></tr></thead>
            <tbody>
              <tr><td>01/09/2025</td><td>01/09/2025</td><td>01/10/2025</td><td>$0.5000</td></tr>
              <tr><td>02/06/2025</td><td>02/06/2025</td><td>02/07/2025</td><td>$0.4000</td></tr>
            </tbody>
          </table>
        </body></html>
    "#;

    fn cfg(out: std::path::PathBuf) -> AppConfig {
        AppConfig { base_url: "https://ym.test".into(), out_dir: out, ..AppConfig::default() }
    }

    #[tokio::test]
    async fn writes_histories_and_summary_and_keeps_going_after_failures() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().to_path_buf();
        let cfg = cfg(out.clone());
        let src = MockSource::new().with_page("https://ym.test/our-etfs/cony/", FUND_PAGE);
        let symbols = vec!["CONY".to_string(), "TSLY".to_string()];

        let result = execute(&src, &cfg, &symbols, Duration::ZERO, d(2025, 2, 20)).await.unwrap();
        assert_eq!(result.ok, 1);
        assert_eq!(result.failed, 1);
        assert!(result.per_symbol[1].error.is_some());
        assert_eq!(src.calls().len(), 2);

        let saved: DividendHistory = store::read_json(&store::history_path(&out, "CONY")).unwrap().unwrap();
        assert_eq!(saved.group, Group::GroupC);
        assert_eq!(saved.frequency, Frequency::Monthly);
        assert_eq!(saved.current_yield, Some(98.5));
        assert_eq!(saved.current_price, Some(9.87));
        assert_eq!(saved.events.len(), 2);
        assert_eq!(saved.events[0].ex_date, d(2025, 2, 6));
        assert_eq!(saved.events[0].group, Some(Group::GroupC));
        assert_eq!(saved.stats.last_amount, 0.4);
        assert!((saved.stats.year_to_date_total - 0.9).abs() < 1e-9);
        assert!(!store::history_path(&out, "TSLY").exists());

        let summary: EtfSummary = store::read_json(&out.join(ETF_SUMMARY_FILE)).unwrap().unwrap();
        assert_eq!(summary.total_etfs, 1);
        assert_eq!(summary.etfs[0].next_ex_date, Some(d(2025, 3, 6)));
        assert_eq!(summary.etfs[0].description, "YieldMax CONY ETF - monthly dividend payments");
    }

    #[tokio::test]
    async fn page_without_rows_keeps_the_previous_file() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().to_path_buf();
        let cfg = cfg(out.clone());
        let url = "https://ym.test/our-etfs/cony/";
        let path = store::history_path(&out, "CONY");

        let good = MockSource::new().with_page(url, FUND_PAGE);
        refresh_symbol(&good, &cfg, &GroupMap::builtin(), "CONY", d(2025, 2, 20)).await.unwrap();
        let before = std::fs::read(&path).unwrap();
        let saved: DividendHistory = serde_json::from_slice(&before).unwrap();
        assert_eq!(saved.events.len(), 2);

        let empty = MockSource::new().with_page(url, "<h1>YieldMax</h1><table><tr><td>no data</td></tr></table>");
        let err = refresh_symbol(&empty, &cfg, &GroupMap::builtin(), "CONY", d(2025, 3, 20)).await.unwrap_err();
        assert!(err.to_string().contains("no distribution rows"));
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn symbols_default_to_known_funds() {
        let args = HistoryCmd { symbols: vec![], limit: Some(3), delay_ms: None, run: RunArgs::default() };
        let syms = resolve_symbols(&args, &GroupMap::builtin()).unwrap();
        assert_eq!(syms, vec!["ABNY", "AFRM", "AIPY"]);

        let args = HistoryCmd { symbols: vec!["tsly,cony".into()], limit: None, delay_ms: None, run: RunArgs::default() };
        assert_eq!(resolve_symbols(&args, &GroupMap::builtin()).unwrap(), vec!["TSLY", "CONY"]);

        let args = HistoryCmd { symbols: vec!["../X".into()], limit: None, delay_ms: None, run: RunArgs::default() };
        assert!(resolve_symbols(&args, &GroupMap::builtin()).is_err());
    }
}
