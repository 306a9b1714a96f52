use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Fmp;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Connect, History, Calendar, Profile, Write }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Connect => "connect",
        Phase::History => "history",
        Phase::Calendar => "calendar",
        Phase::Profile => "profile",
        Phase::Write => "write",
    }}
    fn span(&self) -> Span { match self {
        Phase::Connect => info_span!("connect"),
        Phase::History => info_span!("history"),
        Phase::Calendar => info_span!("calendar"),
        Phase::Profile => info_span!("profile"),
        Phase::Write => info_span!("write"),
    }}
}

impl OpMarker for Fmp {
    const NAME: &'static str = "fmp";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("fmp") }
}
