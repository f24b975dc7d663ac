//! Keyed, singleflight cache of normalized source files.
//!
//! The first caller for a key spawns a tokio task that resolves the configured
//! link, downloads the CSV and normalizes it with the file's schema. Every
//! caller for that key, the first included, awaits a shared handle to the
//! task, so a caller that gives up does not cancel the download for the
//! others. Failures are cached as an empty record set with the reason in the
//! entry's [`SourceStatus`], and are not retried until the key is invalidated.
//!
//! Invalidation detaches the handle: callers already waiting on it still get
//! its result, new callers start a fresh download.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dash_core::error::{DashError, Result};
use dash_core::models::{NormalizedRecord, SourceStatus};
use dash_data::normalizer::normalize_csv;
use dash_data::schema::schema_for;
use futures::future::{join_all, BoxFuture, FutureExt, Shared};

use crate::fetcher::Fetcher;
use crate::resolver::{resolve, with_cache_buster};

type Slot = Shared<BoxFuture<'static, CacheEntry>>;

// ── CacheEntry ────────────────────────────────────────────────────────────────

/// Outcome of loading one file. Replaced whole, never patched.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub records: Arc<Vec<NormalizedRecord>>,
    pub status: SourceStatus,
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn failed(status: SourceStatus, fetched_at: DateTime<Utc>) -> Self {
        Self {
            records: Arc::new(Vec::new()),
            status,
            fetched_at,
        }
    }
}

// ── FetchCache ────────────────────────────────────────────────────────────────

/// Source cache shared by every consumer of a refresh cycle.
///
/// # Example
/// ```no_run
/// use std::collections::BTreeMap;
/// use dash_runtime::fetch_cache::FetchCache;
/// use dash_runtime::fetcher::HttpFetcher;
///
/// # async fn demo() -> dash_core::Result<()> {
/// let mut sources = BTreeMap::new();
/// sources.insert(
///     "Email_Campaigns.csv".to_string(),
///     "https://drive.google.com/file/d/abc/view".to_string(),
/// );
/// let cache = FetchCache::new(HttpFetcher::new()?, sources);
/// let records = cache.load("Email_Campaigns.csv").await;
/// println!("{} rows", records.len());
/// # Ok(())
/// # }
/// ```
pub struct FetchCache<F: Fetcher> {
    fetcher: Arc<F>,
    /// Logical file name → share link, as configured.
    sources: Mutex<BTreeMap<String, String>>,
    entries: Mutex<HashMap<String, Slot>>,
    /// Upper bound on a single download.
    deadline: Option<Duration>,
}

impl<F: Fetcher> FetchCache<F> {
    pub fn new(fetcher: F, sources: BTreeMap<String, String>) -> Self {
        Self {
            fetcher: Arc::new(fetcher),
            sources: Mutex::new(sources),
            entries: Mutex::new(HashMap::new()),
            deadline: None,
        }
    }

    /// Fail any download that takes longer than `deadline`.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    // ── Public API ────────────────────────────────────────────────────────

    /// Records for `file_name`, downloading them on first use.
    ///
    /// Never fails: a file that could not be loaded yields an empty set and
    /// the reason is available through [`FetchCache::status`].
    pub async fn load(&self, file_name: &str) -> Arc<Vec<NormalizedRecord>> {
        let slot = self.slot(file_name);
        if let Some(entry) = slot.peek() {
            tracing::debug!(file = file_name, "source cache hit");
            return Arc::clone(&entry.records);
        }
        slot.await.records
    }

    /// Load several files concurrently, keyed by file name.
    pub async fn load_many<S: AsRef<str>>(
        &self,
        file_names: &[S],
    ) -> BTreeMap<String, Arc<Vec<NormalizedRecord>>> {
        let loads = file_names.iter().map(|name| async move {
            let name = name.as_ref();
            (name.to_string(), self.load(name).await)
        });
        join_all(loads).await.into_iter().collect()
    }

    /// Load every configured file.
    pub async fn load_all(&self) -> BTreeMap<String, Arc<Vec<NormalizedRecord>>> {
        let names = self.source_names();
        self.load_many(&names).await
    }

    /// Drop the entry for `file_name` so the next load downloads it again.
    pub fn invalidate(&self, file_name: &str) {
        if self.entries().remove(file_name).is_some() {
            tracing::debug!(file = file_name, "source cache entry invalidated");
        }
    }

    pub fn invalidate_all(&self) {
        let mut entries = self.entries();
        let dropped = entries.len();
        entries.clear();
        tracing::debug!(dropped, "source cache cleared");
    }

    /// Status of the last completed load of `file_name`.
    pub fn status(&self, file_name: &str) -> Option<SourceStatus> {
        self.entry(file_name).map(|e| e.status)
    }

    /// Statuses of every completed load, keyed by file name.
    pub fn statuses(&self) -> BTreeMap<String, SourceStatus> {
        self.entries()
            .iter()
            .filter_map(|(name, slot)| slot.peek().map(|e| (name.clone(), e.status.clone())))
            .collect()
    }

    /// The completed entry for `file_name`, if any.
    pub fn entry(&self, file_name: &str) -> Option<CacheEntry> {
        self.entries()
            .get(file_name)
            .and_then(|slot| slot.peek().cloned())
    }

    /// Configured file names, sorted.
    pub fn source_names(&self) -> Vec<String> {
        self.sources().keys().cloned().collect()
    }

    /// Replace the source map.
    ///
    /// Every file whose link was added, changed or removed is invalidated;
    /// the rest stay cached.
    pub fn set_sources(&self, sources: BTreeMap<String, String>) {
        let stale: BTreeSet<String> = {
            let mut current = self.sources();
            let stale = current
                .keys()
                .chain(sources.keys())
                .filter(|name| current.get(*name) != sources.get(*name))
                .cloned()
                .collect();
            *current = sources;
            stale
        };
        for name in &stale {
            self.invalidate(name);
        }
        tracing::debug!(invalidated = stale.len(), "source map replaced");
    }

    // ── Private helpers ───────────────────────────────────────────────────

    fn entries(&self) -> MutexGuard<'_, HashMap<String, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sources(&self) -> MutexGuard<'_, BTreeMap<String, String>> {
        self.sources.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The slot for `file_name`, spawning its download if there is none.
    fn slot(&self, file_name: &str) -> Slot {
        let mut entries = self.entries();
        if let Some(slot) = entries.get(file_name) {
            return slot.clone();
        }
        let slot = self.spawn_load(file_name);
        entries.insert(file_name.to_string(), slot.clone());
        slot
    }

    fn spawn_load(&self, file_name: &str) -> Slot {
        let job = LoadJob {
            fetcher: Arc::clone(&self.fetcher),
            file_name: file_name.to_string(),
            share_url: self.sources().get(file_name).cloned(),
            deadline: self.deadline,
        };
        let file = job.file_name.clone();
        let task = tokio::spawn(job.run());
        async move {
            task.await.unwrap_or_else(|e| {
                tracing::error!(file = %file, error = %e, "source load task failed");
                CacheEntry::failed(
                    SourceStatus::failed(format!("Load task failed: {e}")),
                    Utc::now(),
                )
            })
        }
        .boxed()
        .shared()
    }
}

// ── LoadJob ───────────────────────────────────────────────────────────────────

/// Everything one background download needs, owned so it can outlive the
/// caller that started it.
struct LoadJob<F: Fetcher> {
    fetcher: Arc<F>,
    file_name: String,
    share_url: Option<String>,
    deadline: Option<Duration>,
}

impl<F: Fetcher> LoadJob<F> {
    async fn run(self) -> CacheEntry {
        let fetched_at = Utc::now();
        match self.fetch_records().await {
            Ok(records) => {
                tracing::debug!(file = %self.file_name, records = records.len(), "source loaded");
                CacheEntry {
                    status: SourceStatus::ok(format!("Loaded {} records", records.len())),
                    records: Arc::new(records),
                    fetched_at,
                }
            }
            Err(e) => {
                tracing::warn!(file = %self.file_name, error = %e, "source load failed; caching empty result");
                CacheEntry::failed(SourceStatus::from(&e), fetched_at)
            }
        }
    }

    async fn fetch_records(&self) -> Result<Vec<NormalizedRecord>> {
        let share_url = self
            .share_url
            .as_deref()
            .ok_or_else(|| DashError::MissingSource(self.file_name.clone()))?;
        let schema = schema_for(&self.file_name)
            .ok_or_else(|| DashError::MissingSchema(self.file_name.clone()))?;

        let resolved = resolve(share_url);
        let url = with_cache_buster(&resolved.url, Utc::now().timestamp_millis());

        let body = match self.deadline {
            Some(limit) => tokio::time::timeout(limit, self.fetcher.fetch(&url))
                .await
                .map_err(|_| DashError::Timeout {
                    url: resolved.url.clone(),
                    after: limit,
                })??,
            None => self.fetcher.fetch(&url).await?,
        };

        normalize_csv(&body, schema)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
