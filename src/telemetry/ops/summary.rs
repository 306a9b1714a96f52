use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Summary;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Load, Write }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Load => "load",
        Phase::Write => "write",
    }}
    fn span(&self) -> Span { match self {
        Phase::Load => info_span!("load"),
        Phase::Write => info_span!("write"),
    }}
}

impl OpMarker for Summary {
    const NAME: &'static str = "summary";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("summary") }
}
