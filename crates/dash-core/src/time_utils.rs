use chrono::{DateTime, NaiveDate, NaiveDateTime};
use tracing::trace;

use crate::error::{DashError, Result};

// ── Export date parsing ───────────────────────────────────────────────────────

/// Date-only layouts seen in platform exports, tried in order.
///
/// Slash-separated dates are read month-first, which is what every platform
/// export we ingest emits.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%Y",
    "%d.%m.%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %b %Y",
    "%d %B %Y",
];

/// Date-time layouts; only the calendar date is kept.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parse the date column of an export row into a calendar date.
///
/// Handles RFC 3339 timestamps (with `Z` or an offset, keeping the date as
/// written), common date-time patterns and plain dates. Returns `None` for
/// empty strings, placeholders such as `"N/A"` or `"Unknown"`, and anything
/// else that does not match.
pub fn parse_export_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.date_naive());
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.date());
        }
    }

    trace!("could not parse export date \"{}\"", s);
    None
}

/// Parse a strict `YYYY-MM-DD` date, as accepted on the command line and in
/// configuration files.
pub fn parse_iso_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .map_err(|_| DashError::DateParse(s.to_string()))
}

/// Render a date the way the reports expose it (`YYYY-MM-DD`).
pub fn format_date(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
