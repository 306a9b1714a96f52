use std::marker::PhantomData;
use std::time::Instant;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, debug, warn, Span};

use super::config;
use crate::output::Emitter;
use crate::output::config::OutputConfig;
use crate::output::types::{Envelope, Meta};

pub trait PhaseSpan {
    fn name(&self) -> &'static str;
    fn span(&self) -> Span;
}

pub trait OpMarker {
    const NAME: &'static str;
    type Phase: PhaseSpan;
    fn root_span() -> Span;
}

pub struct LogCtx<O: OpMarker> {
    pub(crate) json: bool,
    started: Instant,
    _marker: PhantomData<O>,
}

impl<O: OpMarker> LogCtx<O> {
    pub(crate) fn new(json: bool) -> Self {
        Self { json, started: Instant::now(), _marker: PhantomData }
    }

    fn op_name(&self) -> &'static str { O::NAME }

    pub fn root_span(&self) -> Span { O::root_span() }

    pub fn root_span_kv<'a, T>(&self, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.root_span();
        let details = kv_to_string(fields);
        if details.is_empty() {
            info!(op = %self.op_name(), "start");
        } else {
            info!(op = %self.op_name(), details = %details, "start");
        }
        span
    }

    pub fn span(&self, ph: &O::Phase) -> Span { ph.span() }

    pub fn span_kv<'a, T>(&self, ph: &O::Phase, fields: T) -> Span
    where
        T: IntoIterator<Item = (&'a str, String)>,
    {
        let span = self.span(ph);
        let details = kv_to_string(fields);
        if details.is_empty() {
            debug!(op = %self.op_name(), phase = ph.name(), "span_start");
        } else {
            debug!(op = %self.op_name(), phase = ph.name(), details = %details, "span_start");
        }
        span
    }

    pub fn info(&self, msg: impl AsRef<str>) { if self.json { info!(op = %self.op_name(), "{}", msg.as_ref()); } else { info!("{}", msg.as_ref()); } }
    pub fn warn(&self, msg: impl AsRef<str>) { if self.json { warn!(op = %self.op_name(), "{}", msg.as_ref()); } else { warn!("{}", msg.as_ref()); } }

    pub fn info_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { info!(op = %self.op_name(), details = %details, "{}", msg); }
        else if details.is_empty() { info!("{}", msg); }
        else { info!("{} {}", msg, details); }
    }

    pub fn warn_kv<'a, D>(&self, msg: &str, kv: D)
    where
        D: IntoIterator<Item = (&'a str, String)>,
    {
        let details = kv_to_string(kv);
        if self.json { warn!(op = %self.op_name(), details = %details, "{}", msg); }
        else if details.is_empty() { warn!("{}", msg); }
        else { warn!("{} {}", msg, details); }
    }

    fn meta(&self) -> Meta {
        Meta { duration_ms: Some(self.started.elapsed().as_millis()), out_dir: None }
    }

    pub fn plan<T: Serialize>(&self, plan: &T) -> Result<()> {
        emit(&Envelope::plan(O::NAME, plan, Some(self.meta()))?)
    }

    pub fn result<T: Serialize>(&self, result: &T, out_dir: &str) -> Result<()> {
        let meta = Meta { out_dir: Some(out_dir.to_string()), ..self.meta() };
        emit(&Envelope::result(O::NAME, result, Some(meta))?)
    }

    /// Batch totals, one line per command run.
    pub fn totals(&self, ok: usize, failed: usize, written: usize) {
        if self.json { info!(op = %self.op_name(), ok, failed, written, "totals"); }
        else { info!("📊 {} totals — ok={} failed={} written={}", self.op_name(), ok, failed, written); }
    }
}

// History-specific helpers
impl LogCtx<super::ops::history::History> {
    pub fn symbol_summary(&self, symbol: &str, events: usize, last_amount: f64) {
        if self.json { info!(op = %self.op_name(), symbol, events, last_amount, "symbol_summary"); }
        else { info!("✅ {} — events={} last=${:.4}", symbol, events, last_amount); }
    }
}

fn emit(env: &Envelope) -> Result<()> {
    let cfg = OutputConfig::from_env().with_json_flag(config::json_mode());
    Emitter::from_env(cfg).emit(env).map_err(anyhow::Error::from)
}

fn kv_to_string<'a, T>(kv: T) -> String
where
    T: IntoIterator<Item = (&'a str, String)>,
{
    let mut parts: Vec<String> = Vec::new();
    for (k, v) in kv { parts.push(format!("{}={}", k, v)); }
    parts.join(" ")
}
