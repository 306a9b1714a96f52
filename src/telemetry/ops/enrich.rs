use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Enrich;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Connect, Select, Overview, Merge, Write }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Connect => "connect",
        Phase::Select => "select",
        Phase::Overview => "overview",
        Phase::Merge => "merge",
        Phase::Write => "write",
    }}
    fn span(&self) -> Span { match self {
        Phase::Connect => info_span!("connect"),
        Phase::Select => info_span!("select"),
        Phase::Overview => info_span!("overview"),
        Phase::Merge => info_span!("merge"),
        Phase::Write => info_span!("write"),
    }}
}

impl OpMarker for Enrich {
    const NAME: &'static str = "enrich";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("enrich") }
}
