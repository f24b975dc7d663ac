//! Runtime layer for the campaign dashboard.
//!
//! Resolves sharing links, downloads and caches source files, and drives the
//! periodic refresh loop that feeds the presentation layer.

pub mod fetch_cache;
pub mod fetcher;
pub mod orchestrator;
pub mod resolver;

pub use dash_core as core;
pub use dash_data as data;
