use std::collections::BTreeMap;

use anyhow::{Context, Result, anyhow};
use chrono::{Duration, NaiveDate};
use clap::{Args, Subcommand};
use serde::Serialize;

use crate::api::FmpClient;
use crate::api::fmp::{enrich_with_groups, filter_symbols};
use crate::cli::{RunArgs, normalize_symbols};
use crate::config::AppConfig;
use crate::etf::{EtfMetadata, GroupMap};
use crate::scrape::fetch::{HttpSource, PageSource};
use crate::store::{self, FMP_CALENDAR_FILE, FMP_PROFILES_FILE};
use crate::telemetry::{self, config::json_mode};
use crate::telemetry::ops::fmp::Phase as FmpPhase;
use crate::util::time::{parse_date_arg, today};

const DEFAULT_CALENDAR_DAYS: i64 = 30;

#[derive(Args)]
pub struct FmpCmd {
    #[command(subcommand)]
    pub action: FmpAction,
}

#[derive(Subcommand)]
pub enum FmpAction {
    /// Dividend history per symbol -> fmp_dividends_<SYMBOL>.json
    History {
        #[arg(long = "symbol")] symbols: Vec<String>,
        #[arg(long, default_value_t = 1)] years: u32,
        #[command(flatten)] run: RunArgs,
    },
    /// Fund-family events from the market-wide dividend calendar -> fmp_calendar.json
    Calendar {
        /// YYYY-MM-DD, "+Nd" or "Nd" (default: today)
        #[arg(long)] from: Option<String>,
        /// YYYY-MM-DD, "+Nd" or "Nd" (default: +30d)
        #[arg(long)] to: Option<String>,
        #[command(flatten)] run: RunArgs,
    },
    /// Company profiles -> fmp_profiles.json
    Profile {
        #[arg(long = "symbol")] symbols: Vec<String>,
        #[command(flatten)] run: RunArgs,
    },
}

#[derive(Serialize)]
struct FmpPlan { action: &'static str, requests: usize, sample: Vec<String>, outputs: Vec<String> }

#[derive(Serialize, Debug)]
pub struct FmpApply { pub action: &'static str, pub ok: usize, pub failed: usize, pub events: usize, pub outputs: Vec<String> }

fn symbols_or_all(raw: &[String]) -> Result<Vec<String>> {
    if raw.is_empty() {
        Ok(GroupMap::builtin().symbols().into_iter().map(str::to_string).collect())
    } else {
        normalize_symbols(raw)
    }
}

async fn connect<S: PageSource>(client: &FmpClient<S>) -> Result<()> {
    let _s = telemetry::fmp().span(&FmpPhase::Connect).entered();
    client.test_connection().await.context("fmp connection check failed")
}

fn calendar_range(from: Option<&str>, to: Option<&str>, today: NaiveDate) -> Result<(NaiveDate, NaiveDate)> {
    let from = match from {
        Some(s) => parse_date_arg(s, today).ok_or_else(|| anyhow!("invalid --from date: {s}"))?,
        None => today,
    };
    let to = match to {
        Some(s) => parse_date_arg(s, today).ok_or_else(|| anyhow!("invalid --to date: {s}"))?,
        None => today + Duration::days(DEFAULT_CALENDAR_DAYS),
    };
    if to < from {
        return Err(anyhow!("--to {to} is before --from {from}"));
    }
    Ok((from, to))
}

pub async fn execute_history<S: PageSource>(
    client: &FmpClient<S>,
    cfg: &AppConfig,
    symbols: &[String],
    years: u32,
    today: NaiveDate,
) -> Result<FmpApply> {
    connect(client).await?;
    let log = telemetry::fmp();
    let mapping = GroupMap::builtin();
    let (mut ok, mut failed, mut events) = (0usize, 0usize, 0usize);
    let mut outputs = Vec::new();
    for symbol in symbols {
        let _s = log.span_kv(&FmpPhase::History, [("symbol", symbol.clone())]).entered();
        match client.dividend_history(symbol, years, today).await {
            Ok(mut history) => {
                enrich_with_groups(&mut history, &mapping);
                let path = store::fmp_history_path(&cfg.out_dir, symbol);
                let _w = log.span(&FmpPhase::Write).entered();
                store::write_json(&path, &history)?;
                ok += 1;
                events += history.len();
                outputs.push(path.display().to_string());
            }
            Err(e) => {
                failed += 1;
                log.warn_kv("⚠️ fmp history failed", [("symbol", symbol.clone()), ("error", e.to_string())]);
            }
        }
    }
    Ok(FmpApply { action: "history", ok, failed, events, outputs })
}

pub async fn execute_calendar<S: PageSource>(
    client: &FmpClient<S>,
    cfg: &AppConfig,
    from: NaiveDate,
    to: NaiveDate,
) -> Result<FmpApply> {
    connect(client).await?;
    let log = telemetry::fmp();
    let mapping = GroupMap::builtin();
    let all = {
        let _s = log.span_kv(&FmpPhase::Calendar, [("from", from.to_string()), ("to", to.to_string())]).entered();
        client.dividend_calendar(from, to).await.context("fetching FMP dividend calendar")?
    };
    let mut events = filter_symbols(all, &mapping.symbols());
    enrich_with_groups(&mut events, &mapping);
    events.sort_by(|a, b| a.ex_date.cmp(&b.ex_date).then_with(|| a.symbol.cmp(&b.symbol)));

    let path = cfg.out_dir.join(FMP_CALENDAR_FILE);
    {
        let _s = log.span(&FmpPhase::Write).entered();
        store::write_json(&path, &events)?;
    }
    Ok(FmpApply { action: "calendar", ok: 1, failed: 0, events: events.len(), outputs: vec![path.display().to_string()] })
}

pub async fn execute_profiles<S: PageSource>(
    client: &FmpClient<S>,
    cfg: &AppConfig,
    symbols: &[String],
) -> Result<FmpApply> {
    connect(client).await?;
    let log = telemetry::fmp();
    let mut profiles: BTreeMap<String, EtfMetadata> = BTreeMap::new();
    let mut failed = 0usize;
    for symbol in symbols {
        let _s = log.span_kv(&FmpPhase::Profile, [("symbol", symbol.clone())]).entered();
        match client.profile(symbol).await {
            Ok(p) => { profiles.insert(symbol.clone(), p); }
            Err(e) => {
                failed += 1;
                log.warn_kv("⚠️ fmp profile failed", [("symbol", symbol.clone()), ("error", e.to_string())]);
            }
        }
    }
    let path = cfg.out_dir.join(FMP_PROFILES_FILE);
    {
        let _s = log.span(&FmpPhase::Write).entered();
        store::write_json(&path, &profiles)?;
    }
    Ok(FmpApply { action: "profile", ok: profiles.len(), failed, events: 0, outputs: vec![path.display().to_string()] })
}

fn show_plan(cfg: &AppConfig, plan_limit: usize, plan: FmpPlan) -> Result<()> {
    let log = telemetry::fmp();
    if json_mode() {
        return log.plan(&FmpPlan { sample: plan.sample.into_iter().take(plan_limit).collect(), ..plan });
    }
    log.info(format!("📝 FMP {} plan — requests={} outputs={}", plan.action, plan.requests, plan.outputs.join(",")));
    for s in plan.sample.iter().take(plan_limit) { log.info(format!("  {}", s)); }
    if plan.sample.len() > plan_limit { log.info(format!("  ... ({} more)", plan.sample.len() - plan_limit)); }
    if cfg.fmp_key.is_none() { log.warn("   FMP_API_KEY is not set; --apply will fail."); }
    log.info("   Use --apply to execute.");
    Ok(())
}

pub async fn run(cfg: &AppConfig, args: FmpCmd) -> Result<()> {
    let log = telemetry::fmp();
    let today = today();
    let out = cfg.out_dir.display().to_string();

    let result = match args.action {
        FmpAction::History { symbols, years, run } => {
            let _g = log.root_span_kv([("action", "history".to_string()), ("apply", run.apply.to_string()), ("years", years.to_string())]).entered();
            let symbols = symbols_or_all(&symbols)?;
            if !run.apply {
                let outputs = symbols.iter().map(|s| store::fmp_history_path(&cfg.out_dir, s).display().to_string()).collect();
                return show_plan(cfg, run.plan_limit, FmpPlan { action: "history", requests: symbols.len(), sample: symbols, outputs });
            }
            let client = FmpClient::new(HttpSource::new(cfg)?, cfg)?;
            execute_history(&client, cfg, &symbols, years, today).await?
        }
        FmpAction::Calendar { from, to, run } => {
            let _g = log.root_span_kv([("action", "calendar".to_string()), ("apply", run.apply.to_string())]).entered();
            let (from, to) = calendar_range(from.as_deref(), to.as_deref(), today)?;
            if !run.apply {
                let outputs = vec![cfg.out_dir.join(FMP_CALENDAR_FILE).display().to_string()];
                return show_plan(cfg, run.plan_limit, FmpPlan { action: "calendar", requests: 1, sample: vec![format!("{from}..{to}")], outputs });
            }
            let client = FmpClient::new(HttpSource::new(cfg)?, cfg)?;
            execute_calendar(&client, cfg, from, to).await?
        }
        FmpAction::Profile { symbols, run } => {
            let _g = log.root_span_kv([("action", "profile".to_string()), ("apply", run.apply.to_string())]).entered();
            let symbols = symbols_or_all(&symbols)?;
            if !run.apply {
                let outputs = vec![cfg.out_dir.join(FMP_PROFILES_FILE).display().to_string()];
                return show_plan(cfg, run.plan_limit, FmpPlan { action: "profile", requests: symbols.len(), sample: symbols, outputs });
            }
            let client = FmpClient::new(HttpSource::new(cfg)?, cfg)?;
            execute_profiles(&client, cfg, &symbols).await?
        }
    };

    log.totals(result.ok, result.failed, result.outputs.len());
    log.result(&result, &out)?;
    Ok(())
}
