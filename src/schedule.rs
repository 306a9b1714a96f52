use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use serde::Serialize;

use crate::cli::RunArgs;
use crate::config::AppConfig;
use crate::etf::{Group, Schedule};
use crate::scrape::fetch::{HttpSource, PageSource, schedule_url};
use crate::scrape::parse_schedule_page;
use crate::store::{self, SCHEDULE_FILE};
use crate::telemetry::{self, config::json_mode};
use crate::telemetry::ops::schedule::Phase as SchedulePhase;
use crate::util::time::today;

#[derive(Args)]
pub struct ScheduleCmd {
    #[command(flatten)]
    pub run: RunArgs,
}

#[derive(Serialize)]
struct SchedulePlan { url: String, output: String }

#[derive(Serialize, Debug)]
pub struct GroupNext {
    pub group: Group,
    pub etfs: usize,
    pub next_ex_date: Option<NaiveDate>,
}

#[derive(Serialize, Debug)]
pub struct ScheduleReport {
    pub groups: Vec<GroupNext>,
    pub events: usize,
    pub upcoming: usize,
    pub output: String,
}

/// Fetch and parse the vendor schedule page.
pub async fn fetch_schedule<S: PageSource + ?Sized>(source: &S, cfg: &AppConfig, today: NaiveDate) -> Result<Schedule> {
    let log = telemetry::schedule();
    let url = schedule_url(&cfg.base_url);
    let html = {
        let _s = log.span_kv(&SchedulePhase::Fetch, [("url", url.clone())]).entered();
        source.get_text(&url).await.with_context(|| format!("fetching {url}"))?
    };
    let _s = log.span(&SchedulePhase::Parse).entered();
    Ok(parse_schedule_page(&html, today))
}

pub async fn execute<S: PageSource + ?Sized>(source: &S, cfg: &AppConfig, today: NaiveDate) -> Result<ScheduleReport> {
    let log = telemetry::schedule();
    let schedule = fetch_schedule(source, cfg, today).await?;
    let path = cfg.out_dir.join(SCHEDULE_FILE);
    {
        let _s = log.span_kv(&SchedulePhase::Write, [("path", path.display().to_string())]).entered();
        store::write_json(&path, &schedule)?;
    }
    let events = schedule.groups.iter().map(|g| g.events.len()).sum();
    for g in &schedule.groups {
        log.info_kv("📅 group", [
            ("group", g.group.to_string()),
            ("etfs", g.etfs.len().to_string()),
            ("next_ex", g.next_ex_date.map(|d| d.to_string()).unwrap_or_else(|| "-".into())),
        ]);
    }
    Ok(ScheduleReport {
        groups: schedule
            .groups
            .iter()
            .map(|g| GroupNext { group: g.group, etfs: g.etfs.len(), next_ex_date: g.next_ex_date })
            .collect(),
        events,
        upcoming: schedule.upcoming.len(),
        output: path.display().to_string(),
    })
}

pub async fn run(cfg: &AppConfig, args: ScheduleCmd) -> Result<()> {
    let log = telemetry::schedule();
    let _g = log.root_span_kv([
        ("apply", args.run.apply.to_string()),
        ("base_url", cfg.base_url.clone()),
    ]).entered();

    let url = schedule_url(&cfg.base_url);
    let output = cfg.out_dir.join(SCHEDULE_FILE).display().to_string();
    if !args.run.apply {
        if json_mode() {
            log.plan(&SchedulePlan { url, output })?;
        } else {
            log.info(format!("📝 Schedule plan — fetch {} and write {}", url, output));
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let source = HttpSource::new(cfg)?;
    let report = execute(&source, cfg, today()).await?;
    log.totals(report.groups.len(), 0, 1);
    log.info(format!("✅ Wrote {} ({} events, {} upcoming)", report.output, report.events, report.upcoming));
    log.result(&report, &cfg.out_dir.display().to_string())?;
    Ok(())
}

#[cfg(test)]
pub(crate) const TEST_SCHEDULE_PAGE: &str = r#"
    <html><body>
      <h2>Target 12 Distribution Schedule</h2>
      <table>
        <tr><th>Declared</th><th>Ex Date</th><th>Pay Date</th></tr>
        <tr><td>4/1/25</td><td>4/2/25</td><td>4/3/25</td></tr>
      </table>
      <h2>Weekly Payers &amp; Groups A-D</h2>
      <table>
        <tr><th>Group</th><th>Declared</th><th>Ex Date</th><th>Pay Date</th></tr>
        <tr><td>Group A</td><td>3/18/25</td><td>3/19/25</td><td>3/20/25</td></tr>
        <tr><td>Weekly Payers</td><td>3/12/25</td><td>3/13/25</td><td>3/14/25</td></tr>
      </table>
    </body></html>
"#;
