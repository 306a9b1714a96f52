use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Schedule;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Fetch, Parse, Write }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Fetch => "fetch",
        Phase::Parse => "parse",
        Phase::Write => "write",
    }}
    fn span(&self) -> Span { match self {
        Phase::Fetch => info_span!("fetch"),
        Phase::Parse => info_span!("parse"),
        Phase::Write => info_span!("write"),
    }}
}

impl OpMarker for Schedule {
    const NAME: &'static str = "schedule";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("schedule") }
}
