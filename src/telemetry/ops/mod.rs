pub mod schedule;
pub mod history;
pub mod etfs;
pub mod enrich;
pub mod fmp;
pub mod summary;
