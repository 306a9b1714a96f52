use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::etf::Etf;

// Plan envelope types
#[derive(Serialize)]
pub struct SymbolSample { pub symbol: String, pub url: String }

#[derive(Serialize)]
pub struct HistoryPlan { pub symbols: usize, pub delay_ms: u64, pub out_dir: String, pub sample_symbols: Vec<SymbolSample> }

// Apply/result envelope types
#[derive(Serialize, Debug)]
pub struct SymbolOutcome {
    pub symbol: String,
    pub events: usize,
    pub last_amount: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct HistoryApply { pub ok: usize, pub failed: usize, pub per_symbol: Vec<SymbolOutcome>, pub summary_etfs: usize }

/// Shape of `etf_summary.json`.
#[derive(Serialize, Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct EtfSummary {
    pub last_updated: DateTime<Utc>,
    pub etfs: Vec<Etf>,
    #[serde(rename = "totalETFs")]
    pub total_etfs: usize,
}
