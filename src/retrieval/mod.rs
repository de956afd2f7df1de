//! Row retrieval: per-table fetch with projection, and multi-table fan-out.

pub mod aggregate;
pub mod fetcher;

pub use aggregate::{AggregateConfig, LotAggregator, TableRows};
pub use fetcher::RowFetcher;
