use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{DashError, Result};
use crate::models::{ComparisonSpec, DateRange};
use crate::time_utils::parse_iso_date;

/// Bounds for the refresh interval, in minutes.
pub const MIN_REFRESH_MINUTES: u32 = 1;
pub const MAX_REFRESH_MINUTES: u32 = 60;
pub const DEFAULT_REFRESH_MINUTES: u32 = 5;

/// Default number of entries in ranked lists.
pub const DEFAULT_TOP_N: usize = 5;

/// Default report window when no `--start` is given.
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Marketing dashboard data pipeline
#[derive(Parser, Debug, Clone)]
#[command(
    name = "campaign-dash",
    about = "Marketing dashboard data pipeline",
    version
)]
pub struct Settings {
    /// Dashboard configuration file (defaults to ~/.campaign-dash/config.json)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// First day of the report period (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg)]
    pub start: Option<NaiveDate>,

    /// Last day of the report period (YYYY-MM-DD, defaults to today)
    #[arg(long, value_parser = parse_date_arg)]
    pub end: Option<NaiveDate>,

    /// First day of the comparison period (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg, requires = "compare_end")]
    pub compare_start: Option<NaiveDate>,

    /// Last day of the comparison period (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date_arg, requires = "compare_start")]
    pub compare_end: Option<NaiveDate>,

    /// Compare against the equally long period right before the report period
    #[arg(long, conflicts_with_all = ["compare_start", "compare_end"])]
    pub compare_previous: bool,

    /// Number of entries in ranked lists
    #[arg(long, default_value_t = DEFAULT_TOP_N)]
    pub top: usize,

    /// Keep running and print a fresh snapshot every refresh interval
    #[arg(long)]
    pub watch: bool,

    /// Override the configured refresh interval in minutes (1-60)
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=60))]
    pub refresh_minutes: Option<u32>,

    /// Logging level
    #[arg(long, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Settings {
    /// Build the comparison spec described by the date flags.
    ///
    /// Without `--start` the report covers the last [`DEFAULT_WINDOW_DAYS`]
    /// days ending on `end` (or `today`).
    pub fn comparison_spec(&self, today: NaiveDate) -> Result<ComparisonSpec> {
        let end = self.end.unwrap_or(today);
        let primary = match self.start {
            Some(start) => DateRange::new(start, end)?,
            None => DateRange::last_n_days(end, DEFAULT_WINDOW_DAYS),
        };

        if self.compare_previous {
            return Ok(ComparisonSpec::against_previous(primary));
        }

        match (self.compare_start, self.compare_end) {
            (Some(start), Some(end)) => Ok(ComparisonSpec::against(
                primary,
                DateRange::new(start, end)?,
            )),
            _ => Ok(ComparisonSpec::single(primary)),
        }
    }

    /// Effective log level after applying `--debug`.
    pub fn effective_log_level(&self) -> &str {
        if self.debug {
            "DEBUG"
        } else {
            &self.log_level
        }
    }
}

fn parse_date_arg(s: &str) -> std::result::Result<NaiveDate, String> {
    parse_iso_date(s).map_err(|e| e.to_string())
}

// ── DashboardConfig ────────────────────────────────────────────────────────────

/// Per-dashboard source configuration, owned by the UI layer and read-only to
/// the pipeline for the duration of a refresh cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Logical file name (e.g. `FB_Reach.csv`) to sharing link.
    #[serde(default)]
    pub files: BTreeMap<String, String>,
    #[serde(default = "default_refresh_minutes")]
    pub refresh_interval_minutes: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
}

fn default_refresh_minutes() -> u32 {
    DEFAULT_REFRESH_MINUTES
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            files: BTreeMap::new(),
            refresh_interval_minutes: DEFAULT_REFRESH_MINUTES,
            last_updated: None,
        }
    }
}

impl DashboardConfig {
    /// Return the default path to the config file:
    /// `~/.campaign-dash/config.json`.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Return the config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".campaign-dash").join("config.json")
    }

    /// Load the config from `path`.
    ///
    /// A missing file yields the default (empty) config; a malformed one is an
    /// error so that a typo does not silently drop every source.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        let mut config: Self = serde_json::from_str(&content)?;
        config.clamp_refresh_interval();
        Ok(config)
    }

    /// The refresh interval as a [`Duration`].
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(u64::from(self.refresh_interval_minutes) * 60)
    }

    fn clamp_refresh_interval(&mut self) {
        let clamped = self
            .refresh_interval_minutes
            .clamp(MIN_REFRESH_MINUTES, MAX_REFRESH_MINUTES);
        if clamped != self.refresh_interval_minutes {
            warn!(
                configured = self.refresh_interval_minutes,
                clamped, "refresh interval out of range; clamping"
            );
            self.refresh_interval_minutes = clamped;
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    // ── DashboardConfig persistence ───────────────────────────────────────────

    #[test]
    fn test_config_load() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                "files": {"FB_Reach.csv": "https://drive.google.com/file/d/abc/view"},
                "refresh_interval_minutes": 15,
                "last_updated": "2024-03-01T12:00:00Z"
            }"#,
        )
        .unwrap();

        let loaded = DashboardConfig::load_from(&path).expect("load");
        assert_eq!(
            loaded.files["FB_Reach.csv"],
            "https://drive.google.com/file/d/abc/view"
        );
        assert_eq!(loaded.refresh_interval_minutes, 15);
        assert_eq!(loaded.refresh_interval(), Duration::from_secs(15 * 60));
        assert!(loaded.last_updated.is_some());
    }

    #[test]
    fn test_config_load_leaves_file_untouched() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.json");
        let text = r#"{"files": {}, "refresh_interval_minutes": 600}"#;
        std::fs::write(&path, text).unwrap();

        DashboardConfig::load_from(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_config_default_when_missing() {
        let tmp = TempDir::new().expect("tempdir");
        let loaded =
            DashboardConfig::load_from(&DashboardConfig::config_path_in(tmp.path())).unwrap();
        assert!(loaded.files.is_empty());
        assert_eq!(loaded.refresh_interval_minutes, DEFAULT_REFRESH_MINUTES);
        assert!(loaded.last_updated.is_none());
    }

    #[test]
    fn test_config_malformed_is_error() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            DashboardConfig::load_from(&path),
            Err(DashError::JsonParse(_))
        ));
    }

    #[test]
    fn test_config_clamps_out_of_range_interval() {
        let tmp = TempDir::new().expect("tempdir");
        let path = tmp.path().join("config.json");
        std::fs::write(&path, r#"{"files": {}, "refresh_interval_minutes": 600}"#).unwrap();
        let loaded = DashboardConfig::load_from(&path).unwrap();
        assert_eq!(loaded.refresh_interval_minutes, MAX_REFRESH_MINUTES);

        std::fs::write(&path, r#"{"refresh_interval_minutes": 0}"#).unwrap();
        let loaded = DashboardConfig::load_from(&path).unwrap();
        assert_eq!(loaded.refresh_interval_minutes, MIN_REFRESH_MINUTES);
    }

    // ── Settings CLI ─────────────────────────────────────────────────────────

    #[test]
    fn test_settings_default_values() {
        let settings = Settings::parse_from(["campaign-dash"]);
        assert!(settings.config.is_none());
        assert!(settings.start.is_none());
        assert!(settings.end.is_none());
        assert!(!settings.compare_previous);
        assert_eq!(settings.top, DEFAULT_TOP_N);
        assert!(!settings.watch);
        assert!(settings.refresh_minutes.is_none());
        assert_eq!(settings.log_level, "INFO");
        assert!(!settings.debug);
    }

    #[test]
    fn test_settings_rejects_bad_date() {
        let result = Settings::try_parse_from(["campaign-dash", "--start", "03/01/2024"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_settings_refresh_minutes_range() {
        assert!(Settings::try_parse_from(["campaign-dash", "--refresh-minutes", "61"]).is_err());
        let s = Settings::parse_from(["campaign-dash", "--refresh-minutes", "30"]);
        assert_eq!(s.refresh_minutes, Some(30));
    }

    #[test]
    fn test_settings_debug_overrides_log_level() {
        let s = Settings::parse_from(["campaign-dash", "--debug"]);
        assert_eq!(s.effective_log_level(), "DEBUG");
    }

    #[test]
    fn test_comparison_spec_default_window() {
        let s = Settings::parse_from(["campaign-dash"]);
        let spec = s.comparison_spec(ymd(2024, 3, 30)).unwrap();
        assert_eq!(spec.primary.start(), ymd(2024, 3, 1));
        assert_eq!(spec.primary.end(), ymd(2024, 3, 30));
        assert!(spec.comparison.is_none());
    }

    #[test]
    fn test_comparison_spec_explicit_ranges() {
        let s = Settings::parse_from([
            "campaign-dash",
            "--start",
            "2024-02-01",
            "--end",
            "2024-02-29",
            "--compare-start",
            "2024-01-01",
            "--compare-end",
            "2024-01-31",
        ]);
        let spec = s.comparison_spec(ymd(2024, 6, 1)).unwrap();
        assert_eq!(spec.primary.days(), 29);
        let prior = spec.comparison.unwrap();
        assert_eq!(prior.start(), ymd(2024, 1, 1));
        assert_eq!(prior.days(), 31);
    }

    #[test]
    fn test_comparison_spec_previous_period() {
        let s = Settings::parse_from([
            "campaign-dash",
            "--start",
            "2024-01-08",
            "--end",
            "2024-01-14",
            "--compare-previous",
        ]);
        let spec = s.comparison_spec(ymd(2024, 6, 1)).unwrap();
        assert_eq!(spec.comparison.unwrap().start(), ymd(2024, 1, 1));
    }

    #[test]
    fn test_comparison_spec_inverted_range_is_error() {
        let s = Settings::parse_from(["campaign-dash", "--start", "2024-02-10", "--end", "2024-02-01"]);
        assert!(matches!(
            s.comparison_spec(ymd(2024, 6, 1)),
            Err(DashError::InvalidDateRange { .. })
        ));
    }
}
