//! Share-link resolution.
//!
//! Turns the human-facing sharing links pasted into the dashboard
//! configuration into URLs that return raw CSV. Pure string work: nothing in
//! this module touches the network.

use std::sync::OnceLock;

use dash_core::error::DashError;
use dash_core::models::SourceStatus;
use regex::Regex;
use reqwest::Url;
use serde::Serialize;

/// Query parameter appended to every download so intermediaries never serve
/// a stale export.
pub const CACHE_BUST_PARAM: &str = "_cb";

const DRIVE_DOWNLOAD: &str = "https://drive.google.com/uc?export=download&id=";

// ── Public types ──────────────────────────────────────────────────────────────

/// Which link shape a source URL was recognised as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// `.../file/d/{id}/view`
    DriveFile,
    /// `.../open?id={id}` or `.../uc?id={id}`
    DriveOpen,
    /// `.../spreadsheets/d/{id}/edit`
    Spreadsheet,
    /// Anything else; fetched as given.
    Unrecognized,
}

/// A direct-download URL plus the link shape it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedSource {
    pub url: String,
    pub kind: SourceKind,
}

impl ResolvedSource {
    pub fn is_recognized(&self) -> bool {
        self.kind != SourceKind::Unrecognized
    }
}

// ── Patterns ──────────────────────────────────────────────────────────────────

fn spreadsheet_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/spreadsheets/d/([A-Za-z0-9_-]+)").expect("regex is valid"))
}

fn file_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/file/d/([A-Za-z0-9_-]+)").expect("regex is valid"))
}

fn id_query_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"/(?:open|uc)\?(?:[^#]*&)?id=([A-Za-z0-9_-]+)").expect("regex is valid")
    })
}

fn capture<'a>(re: &Regex, text: &'a str) -> Option<&'a str> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

// ── Public functions ──────────────────────────────────────────────────────────

/// Resolve a sharing link to a direct CSV download URL.
///
/// Spreadsheet links become a CSV export of the first sheet; Drive file links
/// become a direct download. A link with no recognisable id is returned
/// unchanged with [`SourceKind::Unrecognized`] and a warning is logged.
pub fn resolve(share_url: &str) -> ResolvedSource {
    let input = share_url.trim();

    if let Some(id) = capture(spreadsheet_re(), input) {
        return ResolvedSource {
            url: format!("https://docs.google.com/spreadsheets/d/{id}/export?format=csv"),
            kind: SourceKind::Spreadsheet,
        };
    }
    if let Some(id) = capture(file_re(), input) {
        return ResolvedSource {
            url: format!("{DRIVE_DOWNLOAD}{id}"),
            kind: SourceKind::DriveFile,
        };
    }
    if let Some(id) = capture(id_query_re(), input) {
        return ResolvedSource {
            url: format!("{DRIVE_DOWNLOAD}{id}"),
            kind: SourceKind::DriveOpen,
        };
    }

    let err = DashError::Resolution(input.to_string());
    tracing::warn!(error = %err, "using source URL as given");
    ResolvedSource {
        url: input.to_string(),
        kind: SourceKind::Unrecognized,
    }
}

/// Check a configured source URL without fetching it.
pub fn validate_source(url: &str) -> SourceStatus {
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return SourceStatus::failed("No URL configured");
    }
    match Url::parse(trimmed) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {}
        Ok(parsed) => {
            return SourceStatus::failed(format!("Unsupported scheme: {}", parsed.scheme()))
        }
        Err(e) => return SourceStatus::failed(format!("Malformed URL: {e}")),
    }

    match resolve(trimmed).kind {
        SourceKind::Spreadsheet => SourceStatus::ok("Google Sheets link"),
        SourceKind::DriveFile | SourceKind::DriveOpen => SourceStatus::ok("Google Drive file link"),
        SourceKind::Unrecognized => {
            SourceStatus::ok("Not a Drive or Sheets link; it will be fetched as given")
        }
    }
}

/// Append [`CACHE_BUST_PARAM`] with `token` to `url`.
///
/// A URL that does not parse is returned unchanged.
pub fn with_cache_buster(url: &str, token: i64) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed
                .query_pairs_mut()
                .append_pair(CACHE_BUST_PARAM, &token.to_string());
            parsed.into()
        }
        Err(_) => url.to_string(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
