use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct History;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Symbol, Fetch, Parse, Write, Summary }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Symbol => "symbol",
        Phase::Fetch => "fetch",
        Phase::Parse => "parse",
        Phase::Write => "write",
        Phase::Summary => "summary",
    }}
    fn span(&self) -> Span { match self {
        Phase::Symbol => info_span!("symbol"),
        Phase::Fetch => info_span!("fetch"),
        Phase::Parse => info_span!("parse"),
        Phase::Write => info_span!("write"),
        Phase::Summary => info_span!("summary"),
    }}
}

impl OpMarker for History {
    const NAME: &'static str = "history";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("history") }
}
