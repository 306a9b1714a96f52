use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Etfs;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Schedule, Details, Write }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Schedule => "schedule",
        Phase::Details => "details",
        Phase::Write => "write",
    }}
    fn span(&self) -> Span { match self {
        Phase::Schedule => info_span!("schedule"),
        Phase::Details => info_span!("details"),
        Phase::Write => info_span!("write"),
    }}
}

impl OpMarker for Etfs {
    const NAME: &'static str = "etfs";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("etfs") }
}
