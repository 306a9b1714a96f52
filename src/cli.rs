use std::sync::OnceLock;

use anyhow::{Result, bail};
use clap::Args;
use regex::Regex;

/// Flags every command shares.
#[derive(Args, Clone, Debug, Default)]
pub struct RunArgs {
    /// Perform fetches and writes; without it the command only prints its plan
    #[arg(long, default_value_t = false)]
    pub apply: bool,
    /// Max items listed in a plan
    #[arg(long, default_value_t = 10)]
    pub plan_limit: usize,
}

static SYMBOL_RE: OnceLock<Regex> = OnceLock::new();

// Symbols end up in file names and URL paths.
fn symbol_re() -> &'static Regex {
    SYMBOL_RE.get_or_init(|| Regex::new(r"^[A-Z0-9.]{1,10}$").expect("valid regex"))
}

/// Uppercased, trimmed, de-duplicated symbols in first-seen order.
/// Anything outside `[A-Z0-9.]{1,10}` is rejected.
pub fn normalize_symbols(raw: &[String]) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::new();
    for s in raw.iter().flat_map(|s| s.split(',')) {
        let s = s.trim().to_ascii_uppercase();
        if s.is_empty() { continue; }
        if !symbol_re().is_match(&s) { bail!("invalid symbol: {s:?}"); }
        if !out.contains(&s) { out.push(s); }
    }
    Ok(out)
}
