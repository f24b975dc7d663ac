//! Shared building blocks for the campaign dashboard pipeline.
//!
//! Holds the error type, record and date-range models, the rate and funnel
//! calculations, number formatting helpers and configuration.

pub mod calculations;
pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{DashError, Result};
