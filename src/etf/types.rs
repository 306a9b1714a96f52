use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Distribution group as published on the vendor's schedule page.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Group {
    Target12,
    Weekly,
    GroupA,
    GroupB,
    GroupC,
    GroupD,
    Unknown,
}

impl Group {
    pub const ALL: [Group; 6] = [
        Group::GroupA,
        Group::GroupB,
        Group::GroupC,
        Group::GroupD,
        Group::Target12,
        Group::Weekly,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Group::Target12 => "Target12",
            Group::Weekly => "Weekly",
            Group::GroupA => "GroupA",
            Group::GroupB => "GroupB",
            Group::GroupC => "GroupC",
            Group::GroupD => "GroupD",
            Group::Unknown => "Unknown",
        }
    }

    /// "A".."D" to the lettered groups.
    pub fn from_letter(letter: &str) -> Option<Group> {
        match letter.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Group::GroupA),
            "B" => Some(Group::GroupB),
            "C" => Some(Group::GroupC),
            "D" => Some(Group::GroupD),
            _ => None,
        }
    }
}

impl fmt::Display for Group {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Frequency {
    Weekly,
    Monthly,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Weekly => "weekly",
            Frequency::Monthly => "monthly",
        }
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendEvent {
    pub symbol: String,
    pub ex_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pay_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub declare_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record_date: Option<NaiveDate>,
    pub amount: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<Group>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency: Option<Frequency>,
}

impl DividendEvent {
    pub fn new(symbol: impl Into<String>, ex_date: NaiveDate, amount: f64) -> Self {
        Self {
            symbol: symbol.into(),
            ex_date,
            pay_date: None,
            declare_date: None,
            record_date: None,
            amount,
            group: None,
            frequency: None,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendStats {
    pub total_payments: usize,
    pub average_amount: f64,
    pub last_amount: f64,
    pub year_to_date_total: f64,
    pub trailing_year_total: f64,
    pub change_percent: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DividendHistory {
    pub symbol: String,
    pub name: String,
    pub group: Group,
    pub frequency: Frequency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_yield: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_price: Option<f64>,
    pub events: Vec<DividendEvent>,
    pub stats: DividendStats,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSchedule {
    pub group: Group,
    pub frequency: Frequency,
    pub etfs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_ex_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_pay_date: Option<NaiveDate>,
    pub events: Vec<DividendEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub updated_at: DateTime<Utc>,
    pub groups: Vec<GroupSchedule>,
    pub upcoming: Vec<DividendEvent>,
}

impl Schedule {
    pub fn group(&self, group: Group) -> Option<&GroupSchedule> {
        self.groups.iter().find(|g| g.group == group)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Etf {
    pub symbol: String,
    pub name: String,
    pub group: Group,
    pub frequency: Frequency,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_ex_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_pay_date: Option<NaiveDate>,
}

/// Parsed contents of a single fund page.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct EtfDetail {
    pub symbol: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub frequency: Option<Frequency>,
    pub current_yield: Option<f64>,
    pub current_price: Option<f64>,
    pub history: Vec<DividendEvent>,
}

/// Provider-neutral fund metadata. Numeric fields stay as the provider's strings.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EtfMetadata {
    pub symbol: String,
    pub name: String,
    pub description: String,
    pub exchange: String,
    pub currency: String,
    pub country: String,
    pub sector: String,
    pub industry: String,
    pub asset_type: String,
    pub market_cap: String,
    pub dividend_per_share: String,
    pub dividend_yield: String,
    pub dividend_date: String,
    pub ex_dividend_date: String,
    pub beta: String,
    pub week52_high: String,
    pub week52_low: String,
    pub day50_moving_average: String,
    pub day200_moving_average: String,
    pub shares_outstanding: String,
    pub fiscal_year_end: String,
    pub pe_ratio: String,
    pub book_value: String,
    pub eps: String,
    pub profit_margin: String,
    pub operating_margin: String,
    pub return_on_assets: String,
    pub return_on_equity: String,
    pub last_updated: Option<DateTime<Utc>>,
    pub source: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self { success: true, data, timestamp: Utc::now(), error: None }
    }
}
