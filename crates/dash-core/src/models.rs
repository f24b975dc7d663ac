use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{DashError, Result};
use crate::time_utils::parse_export_date;

/// Placeholder used for text and date fields the export did not provide.
pub const UNKNOWN: &str = "Unknown";

// ── Date ranges ───────────────────────────────────────────────────────────────

/// An inclusive range of calendar dates. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, rejecting one whose start lies after its end.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(DashError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// The `n` days ending on (and including) `end`. `n` of 0 is treated as 1.
    pub fn last_n_days(end: NaiveDate, n: u32) -> Self {
        let span = i64::from(n.max(1)) - 1;
        Self {
            start: end - Duration::days(span),
            end,
        }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, counting both bounds.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Inclusive membership test.
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// The range of equal length that ends the day before this one starts.
    pub fn preceding(&self) -> Self {
        let end = self.start - Duration::days(1);
        Self {
            start: end - Duration::days(self.days() - 1),
            end,
        }
    }
}

/// A primary period plus an optional period to compare it against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonSpec {
    pub primary: DateRange,
    pub comparison: Option<DateRange>,
}

impl ComparisonSpec {
    pub fn single(primary: DateRange) -> Self {
        Self {
            primary,
            comparison: None,
        }
    }

    pub fn against(primary: DateRange, comparison: DateRange) -> Self {
        Self {
            primary,
            comparison: Some(comparison),
        }
    }

    /// Compare `primary` with the equally long period right before it.
    pub fn against_previous(primary: DateRange) -> Self {
        Self::against(primary, primary.preceding())
    }
}

// ── Normalized records ────────────────────────────────────────────────────────

/// A typed cell value produced by the normalizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Count(u64),
    Number(f64),
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> f64 {
        match self {
            FieldValue::Count(n) => *n as f64,
            FieldValue::Number(n) => *n,
            FieldValue::Text(_) => 0.0,
        }
    }
}

/// One export row after normalization, keyed by stable internal field names.
///
/// Lookups of fields the record does not carry fall back to the same defaults
/// the normalizer applies: `0` for numbers and [`UNKNOWN`] for text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: FieldValue) {
        self.fields.insert(key.into(), value);
    }

    /// Builder-style [`insert`](Self::insert), handy for fixtures.
    pub fn with(mut self, key: impl Into<String>, value: FieldValue) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn text(&self, key: &str) -> &str {
        match self.fields.get(key) {
            Some(FieldValue::Text(s)) => s.as_str(),
            _ => UNKNOWN,
        }
    }

    pub fn count(&self, key: &str) -> u64 {
        match self.fields.get(key) {
            Some(FieldValue::Count(n)) => *n,
            Some(FieldValue::Number(n)) if n.is_finite() && *n > 0.0 => n.round() as u64,
            _ => 0,
        }
    }

    pub fn number(&self, key: &str) -> f64 {
        self.fields.get(key).map(FieldValue::as_f64).unwrap_or(0.0)
    }

    /// Calendar date of the record's `date` field, if it parses.
    pub fn date(&self) -> Option<NaiveDate> {
        parse_export_date(self.text(DATE_FIELD))
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Internal key every schema maps its date column to.
pub const DATE_FIELD: &str = "date";

/// Anything that can be attributed to a calendar day.
pub trait Dated {
    /// `None` when the record cannot be dated.
    fn date(&self) -> Option<NaiveDate>;
}

impl Dated for NormalizedRecord {
    fn date(&self) -> Option<NaiveDate> {
        NormalizedRecord::date(self)
    }
}

// ── Email campaigns ───────────────────────────────────────────────────────────

/// Typed view of one row of the email campaign export.
///
/// Only counts are kept; open and click rates are always derived from them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailCampaign {
    pub name: String,
    pub sent: u64,
    pub opened: u64,
    pub clicked: u64,
    pub unsubscribes: u64,
    pub bounces: u64,
    /// Date column as written in the export (or [`UNKNOWN`]).
    pub date: String,
}

impl EmailCampaign {
    pub const NAME: &'static str = "campaign";
    pub const SENT: &'static str = "sent";
    pub const OPENED: &'static str = "opened";
    pub const CLICKED: &'static str = "clicked";
    pub const UNSUBSCRIBES: &'static str = "unsubscribes";
    pub const BOUNCES: &'static str = "bounces";

    pub fn from_record(record: &NormalizedRecord) -> Self {
        Self {
            name: record.text(Self::NAME).to_string(),
            sent: record.count(Self::SENT),
            opened: record.count(Self::OPENED),
            clicked: record.count(Self::CLICKED),
            unsubscribes: record.count(Self::UNSUBSCRIBES),
            bounces: record.count(Self::BOUNCES),
            date: record.text(DATE_FIELD).to_string(),
        }
    }
}

impl Dated for EmailCampaign {
    fn date(&self) -> Option<NaiveDate> {
        parse_export_date(&self.date)
    }
}

// ── Source diagnostics ────────────────────────────────────────────────────────

/// User-facing outcome of resolving, fetching and parsing one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStatus {
    pub valid: bool,
    pub message: String,
}

impl SourceStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            valid: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            message: message.into(),
        }
    }
}

impl From<&DashError> for SourceStatus {
    fn from(err: &DashError) -> Self {
        Self::failed(err.to_string())
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
