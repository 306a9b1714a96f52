use std::collections::BTreeMap;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};

use crate::api::alpha_vantage::SOURCE_NAME as ALPHA_VANTAGE;
use crate::api::fmp::SOURCE_NAME as FMP;
use crate::cli::RunArgs;
use crate::config::AppConfig;
use crate::etf::{ApiResponse, Etf, EtfMetadata, Group, Schedule};
use crate::store::{
    self, API_SUMMARY_FILE, ETF_SUMMARY_FILE, ETFS_ENRICHED_FILE, ETFS_FILE, FMP_CALENDAR_FILE,
    METADATA_FILE, SCHEDULE_FILE,
};
use crate::telemetry::{self, config::json_mode};
use crate::telemetry::ops::summary::Phase as SummaryPhase;

const VENDOR_SOURCE: &str = "YieldMax website";

#[derive(Args)]
pub struct SummaryCmd {
    #[command(flatten)] pub run: RunArgs,
}

#[derive(Serialize, Deserialize, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ApiSummary {
    #[serde(rename = "totalETFs")]
    pub total_etfs: usize,
    pub groups: BTreeMap<Group, usize>,
    pub endpoints: BTreeMap<String, String>,
    pub data_sources: Vec<String>,
    pub version: String,
    pub last_updated: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_update: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upcoming_events: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_groups: Option<usize>,
    pub enriched_etfs: usize,
}

#[derive(Serialize)]
struct SummaryPlan { inputs: Vec<InputFile>, output: String }

#[derive(Serialize)]
struct InputFile { path: String, present: bool }

#[derive(Serialize, Debug)]
pub struct SummaryApply { pub total_etfs: usize, pub enriched_etfs: usize, pub has_schedule: bool, pub output: String }

fn endpoints() -> BTreeMap<String, String> {
    [
        ("etfs", format!("/{ETFS_FILE}")),
        ("etfs_enriched", format!("/{ETFS_ENRICHED_FILE}")),
        ("schedule", format!("/{SCHEDULE_FILE}")),
        ("history", format!("/{}/{{SYMBOL}}_dividend_history.json", store::HISTORY_DIR)),
        ("etf_summary", format!("/{ETF_SUMMARY_FILE}")),
        ("metadata", format!("/{METADATA_FILE}")),
        ("fmp_calendar", format!("/{FMP_CALENDAR_FILE}")),
        ("api_info", format!("/{API_SUMMARY_FILE}")),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v))
    .collect()
}

/// Pure assembly of the API index from whatever inputs exist.
pub fn build_summary(
    etfs: &[Etf],
    schedule: Option<&Schedule>,
    metadata: Option<&BTreeMap<String, EtfMetadata>>,
    now: DateTime<Utc>,
) -> ApiSummary {
    let mut groups: BTreeMap<Group, usize> = Group::ALL.iter().map(|g| (*g, 0)).collect();
    for e in etfs {
        *groups.entry(e.group).or_default() += 1;
    }

    let mut data_sources = vec![VENDOR_SOURCE.to_string()];
    let enriched_etfs = metadata.map_or(0, |m| m.len());
    if let Some(m) = metadata {
        for source in [ALPHA_VANTAGE, FMP] {
            if m.values().any(|meta| meta.source == source) { data_sources.push(source.to_string()); }
        }
    }

    ApiSummary {
        total_etfs: etfs.len(),
        groups,
        endpoints: endpoints(),
        data_sources,
        version: env!("CARGO_PKG_VERSION").to_string(),
        last_updated: now,
        next_update: schedule.map(|s| s.updated_at + Duration::hours(24)),
        upcoming_events: schedule.map(|s| s.upcoming.len()),
        total_groups: schedule.map(|s| s.groups.len()),
        enriched_etfs,
    }
}

pub fn execute(cfg: &AppConfig) -> Result<SummaryApply> {
    let log = telemetry::summary();
    let (etfs, schedule, metadata) = {
        let _s = log.span(&SummaryPhase::Load).entered();
        let etfs: Vec<Etf> = store::read_json(&cfg.out_dir.join(ETFS_FILE))?.unwrap_or_default();
        let schedule: Option<Schedule> = store::read_json(&cfg.out_dir.join(SCHEDULE_FILE))?;
        let metadata: Option<BTreeMap<String, EtfMetadata>> = store::read_json(&cfg.out_dir.join(METADATA_FILE))?;
        (etfs, schedule, metadata)
    };
    if etfs.is_empty() {
        log.warn(format!("⚠️ no ETFs in {}; run `etfs --apply` first", cfg.out_dir.join(ETFS_FILE).display()));
    }

    let summary = build_summary(&etfs, schedule.as_ref(), metadata.as_ref(), Utc::now());
    let path = cfg.out_dir.join(API_SUMMARY_FILE);
    {
        let _s = log.span_kv(&SummaryPhase::Write, [("path", path.display().to_string())]).entered();
        store::write_json(&path, &ApiResponse::ok(&summary))?;
    }
    Ok(SummaryApply {
        total_etfs: summary.total_etfs,
        enriched_etfs: summary.enriched_etfs,
        has_schedule: schedule.is_some(),
        output: path.display().to_string(),
    })
}

// Always the full list; there are only three inputs.
fn plan_inputs(cfg: &AppConfig) -> Vec<InputFile> {
    [ETFS_FILE, SCHEDULE_FILE, METADATA_FILE]
        .iter()
        .map(|f| {
            let p = cfg.out_dir.join(f);
            InputFile { present: p.exists(), path: p.display().to_string() }
        })
        .collect()
}

pub async fn run(cfg: &AppConfig, args: SummaryCmd) -> Result<()> {
    let log = telemetry::summary();
    let _g = log.root_span_kv([("apply", args.run.apply.to_string())]).entered();

    if !args.run.apply {
        let inputs = plan_inputs(cfg);
        let output = cfg.out_dir.join(API_SUMMARY_FILE).display().to_string();
        if json_mode() {
            log.plan(&SummaryPlan { inputs, output })?;
        } else {
            log.info(format!("📝 Summary plan — write {}", output));
            for i in &inputs {
                log.info(format!("  {} {}", if i.present { "read" } else { "missing" }, i.path));
            }
            log.info("   Use --apply to execute.");
        }
        return Ok(());
    }

    let result = execute(cfg)?;
    log.totals(result.total_etfs, 0, 1);
    log.info(format!("✅ Wrote {} (etfs={} enriched={})", result.output, result.total_etfs, result.enriched_etfs));
    log.result(&result, &cfg.out_dir.display().to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::etf::Frequency;
    use chrono::TimeZone;

    fn etf(symbol: &str, group: Group) -> Etf {
        Etf {
            symbol: symbol.into(),
            name: symbol.into(),
            group,
            frequency: Frequency::Monthly,
            description: String::new(),
            next_ex_date: None,
            next_pay_date: None,
        }
    }

    #[test]
    fn counts_every_group_even_when_empty() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let etfs = vec![etf("TSLY", Group::GroupA), etf("NVDY", Group::GroupA), etf("YMAX", Group::Weekly)];
        let s = build_summary(&etfs, None, None, now);
        assert_eq!(s.total_etfs, 3);
        assert_eq!(s.groups[&Group::GroupA], 2);
        assert_eq!(s.groups[&Group::GroupD], 0);
        assert_eq!(s.groups.len(), 6);
        assert_eq!(s.data_sources, vec![VENDOR_SOURCE]);
        assert!(s.next_update.is_none());
        assert_eq!(s.endpoints["history"], "/dividends/{SYMBOL}_dividend_history.json");
        assert_eq!(s.endpoints["api_info"], "/api_summary.json");
    }

    #[test]
    fn schedule_and_metadata_feed_the_summary() {
        let now = Utc.with_ymd_and_hms(2025, 3, 10, 12, 0, 0).unwrap();
        let updated = Utc.with_ymd_and_hms(2025, 3, 10, 6, 0, 0).unwrap();
        let schedule = Schedule { updated_at: updated, groups: vec![], upcoming: vec![] };
        let mut meta = BTreeMap::new();
        meta.insert("TSLY".to_string(), EtfMetadata { source: ALPHA_VANTAGE.into(), ..Default::default() });

        let s = build_summary(&[], Some(&schedule), Some(&meta), now);
        assert_eq!(s.next_update, Some(Utc.with_ymd_and_hms(2025, 3, 11, 6, 0, 0).unwrap()));
        assert_eq!(s.upcoming_events, Some(0));
        assert_eq!(s.enriched_etfs, 1);
        assert_eq!(s.data_sources, vec![VENDOR_SOURCE, ALPHA_VANTAGE]);
    }

    #[test]
    fn writes_wrapped_summary_from_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().to_path_buf();
        let cfg = AppConfig { out_dir: out.clone(), ..AppConfig::default() };
        store::write_json(&out.join(ETFS_FILE), &vec![etf("CONY", Group::GroupC)]).unwrap();

        let result = execute(&cfg).unwrap();
        assert_eq!(result.total_etfs, 1);
        assert!(!result.has_schedule);

        let v: serde_json::Value = store::read_json(&out.join(API_SUMMARY_FILE)).unwrap().unwrap();
        assert_eq!(v["success"], true);
        assert_eq!(v["data"]["totalETFs"], 1);
        assert_eq!(v["data"]["groups"]["GroupC"], 1);
        assert_eq!(v["data"]["enrichedEtfs"], 0);
    }

    #[test]
    fn plan_lists_every_input() {
        let tmp = tempfile::tempdir().unwrap();
        let cfg = AppConfig { out_dir: tmp.path().to_path_buf(), ..AppConfig::default() };
        store::write_json(&cfg.out_dir.join(SCHEDULE_FILE), &serde_json::json!({})).unwrap();

        let inputs = plan_inputs(&cfg);
        let present: Vec<bool> = inputs.iter().map(|i| i.present).collect();
        assert_eq!(present, vec![false, true, false]);
        assert!(inputs[2].path.ends_with(METADATA_FILE));
    }
}
