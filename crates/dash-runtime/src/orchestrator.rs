//! Periodic dashboard refresh.
//!
//! Runs the full pipeline (load every configured source, analyze, summarize)
//! in a tokio task and sends a [`DashboardSnapshot`] through an `mpsc`
//! channel after every refresh, so the presentation layer never shares
//! mutable state with the loader. The config file is only ever read.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dash_core::models::{ComparisonSpec, SourceStatus};
use dash_core::settings::DashboardConfig;
use dash_data::analysis::{analyze_email, summarize_file, EmailReport, FileSummary};
use dash_data::schema::{schema_for, EMAIL_CAMPAIGNS_FILE};
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time;

use crate::fetch_cache::FetchCache;
use crate::fetcher::Fetcher;

// ── Public types ──────────────────────────────────────────────────────────────

/// Load outcome and period totals for one configured file.
#[derive(Debug, Clone, Serialize)]
pub struct FileSnapshot {
    pub status: SourceStatus,
    /// Rows loaded, across all dates.
    pub records: usize,
    /// Roll-up over the primary range.
    pub summary: FileSummary,
}

/// Everything one refresh produced.
///
/// This is the data contract between the refresh loop and whatever renders
/// the dashboard.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub generated_at: DateTime<Utc>,
    pub email: EmailReport,
    pub files: BTreeMap<String, FileSnapshot>,
}

// ── Snapshot building ─────────────────────────────────────────────────────────

/// Load every configured source through `cache` and run the analysis.
pub async fn build_snapshot<F: Fetcher>(
    cache: &FetchCache<F>,
    spec: &ComparisonSpec,
    top_n: usize,
) -> DashboardSnapshot {
    let loaded = cache.load_all().await;
    let email_records = cache.load(EMAIL_CAMPAIGNS_FILE).await;
    let email = analyze_email(&email_records, spec, top_n);

    let mut files: BTreeMap<String, FileSnapshot> = loaded
        .iter()
        .map(|(name, records)| {
            let snapshot = FileSnapshot {
                status: status_of(cache, name),
                records: records.len(),
                summary: schema_for(name)
                    .map(|schema| summarize_file(records, schema, &spec.primary, top_n))
                    .unwrap_or_default(),
            };
            (name.clone(), snapshot)
        })
        .collect();
    files
        .entry(EMAIL_CAMPAIGNS_FILE.to_string())
        .or_insert_with(|| FileSnapshot {
            status: status_of(cache, EMAIL_CAMPAIGNS_FILE),
            records: 0,
            summary: FileSummary::default(),
        });

    let failed = files.values().filter(|f| !f.status.valid).count();
    tracing::debug!(files = files.len(), failed, "dashboard snapshot built");

    DashboardSnapshot {
        generated_at: Utc::now(),
        email,
        files,
    }
}

fn status_of<F: Fetcher>(cache: &FetchCache<F>, file_name: &str) -> SourceStatus {
    cache
        .status(file_name)
        .unwrap_or_else(|| SourceStatus::failed("Not loaded"))
}

// ── RefreshOrchestrator ───────────────────────────────────────────────────────

/// Background refresh coordinator.
///
/// Call [`RefreshOrchestrator::start`] to run the loop in its own tokio task
/// and receive the snapshot channel.
pub struct RefreshOrchestrator<F: Fetcher> {
    cache: Arc<FetchCache<F>>,
    refresh_interval: Duration,
    spec: ComparisonSpec,
    top_n: usize,
    /// Re-read before every refresh after the first.
    config_path: Option<PathBuf>,
}

impl<F: Fetcher> RefreshOrchestrator<F> {
    pub fn new(
        cache: Arc<FetchCache<F>>,
        refresh_interval: Duration,
        spec: ComparisonSpec,
        top_n: usize,
    ) -> Self {
        Self {
            cache,
            refresh_interval,
            spec,
            top_n,
            config_path: None,
        }
    }

    /// Reload the source map from `path` before each scheduled refresh.
    pub fn with_config_reload(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    /// Spawn the refresh loop.
    ///
    /// Returns the receiving end of the snapshot channel and a
    /// [`RefreshHandle`] that stops the loop.
    pub fn start(self) -> (mpsc::Receiver<DashboardSnapshot>, RefreshHandle) {
        let (tx, rx) = mpsc::channel(4);
        let handle = tokio::spawn(async move {
            self.refresh_loop(tx).await;
        });
        (rx, RefreshHandle { handle })
    }

    /// Build one snapshot right away, then one per interval with reloaded
    /// sources and a cleared cache. Exits once the receiver is gone.
    async fn refresh_loop(self, tx: mpsc::Sender<DashboardSnapshot>) {
        if !self.refresh_and_send(&tx).await {
            return;
        }

        let mut interval = time::interval(self.refresh_interval);
        // The first tick fires immediately; the initial refresh already ran.
        interval.tick().await;

        loop {
            interval.tick().await;

            if tx.is_closed() {
                tracing::debug!("snapshot channel closed; exiting refresh loop");
                break;
            }

            self.reload_sources();
            self.cache.invalidate_all();
            if !self.refresh_and_send(&tx).await {
                break;
            }
        }
    }

    /// A config that fails to load keeps the previous sources.
    fn reload_sources(&self) {
        let Some(path) = &self.config_path else {
            return;
        };
        match DashboardConfig::load_from(path) {
            Ok(config) => self.cache.set_sources(config.files),
            Err(e) => tracing::warn!(
                error = %e,
                path = %path.display(),
                "could not reload config; keeping previous sources"
            ),
        }
    }

    /// `false` when the receiver has been dropped.
    async fn refresh_and_send(&self, tx: &mpsc::Sender<DashboardSnapshot>) -> bool {
        let snapshot = build_snapshot(self.cache.as_ref(), &self.spec, self.top_n).await;
        if let Err(e) = tx.send(snapshot).await {
            tracing::debug!(error = %e, "receiver dropped; stopping refresh loop");
            return false;
        }
        true
    }
}

// ── RefreshHandle ─────────────────────────────────────────────────────────────

/// Handle to the background refresh task.
pub struct RefreshHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl RefreshHandle {
    /// Stop the refresh loop immediately.
    pub fn abort(&self) {
        self.handle.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
