use anyhow::Result;
use chrono::{Duration, NaiveDate};
use clap::Args;
use serde::Serialize;

use crate::cli::RunArgs;
use crate::config::AppConfig;
use crate::etf::{Etf, GroupMap, Schedule, default_frequency, display_name, next_dividend_date};
use crate::schedule::fetch_schedule;
use crate::scrape::fetch::{HttpSource, PageSource, etf_url, schedule_url};
use crate::scrape::parse_detail_page;
use crate::scrape::schedule::mapping_from_schedule;
use crate::store::{self, ETFS_FILE};
use crate::telemetry::{self, config::json_mode};
use crate::telemetry::ops::etfs::Phase as EtfsPhase;
use crate::util::time::today;

#[derive(Args)]
pub struct EtfsCmd {
    /// Take next dates (and group membership) from the live schedule page
    #[arg(long, default_value_t = false)] pub with_schedule: bool,
    /// Refine names, descriptions and frequency from each fund page
    #[arg(long, default_value_t = false)] pub details: bool,
    #[command(flatten)] pub run: RunArgs,
}

#[derive(Serialize)]
struct EtfsPlan { etfs: usize, with_schedule: bool, details: bool, output: String, fetches: Vec<String> }

#[derive(Serialize, Debug)]
pub struct EtfsApply { pub etfs: usize, pub from_schedule: bool, pub detailed: usize, pub failed: usize, pub output: String }

/// One record per mapped symbol, sorted by symbol.
pub fn build_etfs(mapping: &GroupMap, schedule: Option<&Schedule>, today: NaiveDate) -> Vec<Etf> {
    mapping
        .iter()
        .map(|(symbol, group)| {
            let frequency = default_frequency(group);
            let scheduled = schedule.and_then(|s| s.group(group)).and_then(|g| g.next_ex_date.map(|ex| (ex, g.next_pay_date)));
            let (next_ex, next_pay) = match scheduled {
                Some((ex, pay)) => (ex, pay.unwrap_or(ex + Duration::days(1))),
                None => {
                    let ex = next_dividend_date(group, today);
                    (ex, ex + Duration::days(1))
                }
            };
            Etf {
                symbol: symbol.to_string(),
                name: display_name(symbol, group),
                group,
                frequency,
                description: format!("YieldMax {symbol} ETF - {frequency} dividend payments"),
                next_ex_date: Some(next_ex),
                next_pay_date: Some(next_pay),
            }
        })
        .collect()
}

/// Overwrite name/description/frequency with whatever the fund page provides.
/// Returns false when the page could not be fetched.
async fn refine_from_page<S: PageSource + ?Sized>(source: &S, cfg: &AppConfig, etf: &mut Etf, today: NaiveDate) -> bool {
    let url = etf_url(&cfg.base_url, &etf.symbol);
    let html = match source.get_text(&url).await {
        Ok(h) => h,
        Err(e) => {
            tracing::warn!(symbol = %etf.symbol, error = %e, "detail page failed");
            return false;
        }
    };
    let detail = parse_detail_page(&html, &etf.symbol, today);
    if let Some(name) = detail.name { etf.name = name; }
    if let Some(desc) = detail.description { etf.description = desc; }
    if let Some(freq) = detail.frequency { etf.frequency = freq; }
    true
}

pub async fn execute<S: PageSource + ?Sized>(
    source: &S,
    cfg: &AppConfig,
    with_schedule: bool,
    details: bool,
    today: NaiveDate,
) -> Result<EtfsApply> {
    let log = telemetry::etfs();
    let mut mapping = GroupMap::builtin();

    let schedule = if with_schedule {
        let _s = log.span(&EtfsPhase::Schedule).entered();
        match fetch_schedule(source, cfg, today).await {
            Ok(s) => {
                mapping.merge_over(&mapping_from_schedule(&s));
                Some(s)
            }
            Err(e) => {
                log.warn_kv("⚠️ schedule unavailable, using estimated dates", [("error", format!("{:#}", e))]);
                None
            }
        }
    } else {
        None
    };

    let mut etfs = build_etfs(&mapping, schedule.as_ref(), today);

    let (mut detailed, mut failed) = (0usize, 0usize);
    if details {
        let _s = log.span(&EtfsPhase::Details).entered();
        for (i, etf) in etfs.iter_mut().enumerate() {
            if i > 0 && !cfg.request_delay.is_zero() { tokio::time::sleep(cfg.request_delay).await; }
            if refine_from_page(source, cfg, etf, today).await { detailed += 1 } else { failed += 1 }
        }
    }

    let path = cfg.out_dir.join(ETFS_FILE);
    {
        let _s = log.span_kv(&EtfsPhase::Write, [("path", path.display().to_string())]).entered();
        store::write_json(&path, &etfs)?;
    }
    Ok(EtfsApply {
        etfs: etfs.len(),
        from_schedule: schedule.is_some(),
        detailed,
        failed,
        output: path.display().to_string(),
    })
}

pub async fn run(cfg: &AppConfig, args: EtfsCmd) -> Result<()> {
    let log = telemetry::etfs();
    let _g = log.root_span_kv([
        ("apply", args.run.apply.to_string()),
        ("with_schedule", args.with_schedule.to_string()),
        ("details", args.details.to_string()),
    ]).entered();

    if !args.run.apply {
        let mapping = GroupMap::builtin();
        let output = cfg.out_dir.join(ETFS_FILE).display().to_string();
        let mut fetches = Vec::new();
        if args.with_schedule { fetches.push(schedule_url(&cfg.base_url)); }
        if args.details {
            fetches.extend(mapping.symbols().into_iter().map(|s| etf_url(&cfg.base_url, s)));
        }
        if json_mode() {
            let plan = EtfsPlan {
                etfs: mapping.len(),
                with_schedule: args.with_schedule,
                details: args.details,
                output,
                fetches: fetches.into_iter().take(args.run.plan_limit).collect(),
            };
            log.plan(&plan)?;
        } else {
            log.info(format!("📝 ETFs plan — etfs={} fetches={} out={}", mapping.len(), fetches.len(), output));
            for u in fetches.iter().take(args.run.plan_limit) { log.info(format!("  GET {}", u)); }
            if fetches.len() > args.run.plan_limit { log.info(format!("  ... ({} more)", fetches.len() - args.run.plan_limit)); }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let source = HttpSource::new(cfg)?;
    let result = execute(&source, cfg, args.with_schedule, args.details, today()).await?;
    log.totals(result.etfs, result.failed, 1);
    log.info(format!("✅ Wrote {} ({} ETFs)", result.output, result.etfs));
    log.result(&result, &cfg.out_dir.display().to_string())?;
    Ok(())
}
