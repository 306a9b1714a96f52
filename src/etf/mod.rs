pub mod groups;
pub mod stats;
pub mod types;

pub use groups::{GroupMap, default_frequency, display_name, next_dividend_date};
pub use stats::{compute_stats, estimate_next, filter_upcoming};
pub use types::*;
