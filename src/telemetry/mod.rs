pub mod config;
pub mod ctx;
pub mod ops;

use ctx::LogCtx;

pub fn schedule() -> LogCtx<ops::schedule::Schedule> { LogCtx::new(config::logs_are_json()) }
pub fn history() -> LogCtx<ops::history::History> { LogCtx::new(config::logs_are_json()) }
pub fn etfs() -> LogCtx<ops::etfs::Etfs> { LogCtx::new(config::logs_are_json()) }
pub fn enrich() -> LogCtx<ops::enrich::Enrich> { LogCtx::new(config::logs_are_json()) }
pub fn fmp() -> LogCtx<ops::fmp::Fmp> { LogCtx::new(config::logs_are_json()) }
pub fn summary() -> LogCtx<ops::summary::Summary> { LogCtx::new(config::logs_are_json()) }
