//! Data layer for the campaign dashboard.
//!
//! Responsible for turning raw CSV exports into normalized records, selecting
//! records by date range, aggregating totals and rates, ranking campaigns and
//! running the top-level email analysis pipeline.

pub mod aggregator;
pub mod analysis;
pub mod filter;
pub mod normalizer;
pub mod ranker;
pub mod schema;

pub use dash_core as core;
