// SPDX-License-Identifier: Apache-2.0

use crate::cache::view_cache::ViewCache;
use crate::dataset_store::{DatasetStore, StaleSnapshot};
use nccid_model::DatasetVersion;
use nccid_store::{LoadError, LoadErrorCode, Loader, SourceLocation};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{error, info, warn};

#[derive(Default)]
pub struct ReloadMetrics {
    pub successes: AtomicU64,
    pub failures: AtomicU64,
    pub missed_ticks: AtomicU64,
    pub misfires: AtomicU64,
    pub last_skipped_rows: AtomicU64,
    pub last_success_unix_secs: AtomicU64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReloadOutcome {
    pub previous: Option<DatasetVersion>,
    pub version: DatasetVersion,
    pub records: usize,
    pub skipped_rows: u64,
    pub evicted_views: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadError {
    /// Another reload holds the single-flight guard.
    AlreadyRunning,
    Load(LoadError),
    Stale(StaleSnapshot),
}

impl ReloadError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::AlreadyRunning => "reload_in_progress",
            Self::Load(e) => e.code.as_str(),
            Self::Stale(_) => "stale_snapshot",
        }
    }
}

impl Display for ReloadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyRunning => write!(f, "a reload is already running"),
            Self::Load(e) => write!(f, "{e}"),
            Self::Stale(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ReloadError {}

/// Runs Loader then DatasetStore swap, at most one at a time.
///
/// Scheduler ticks and manual refreshes both go through `reload_now`; a call
/// that finds a reload in flight returns `AlreadyRunning` instead of waiting.
pub struct Reloader {
    loader: Arc<Loader>,
    location: SourceLocation,
    store: Arc<DatasetStore>,
    cache: Arc<ViewCache>,
    load_timeout: Duration,
    running: Mutex<()>,
    pub metrics: ReloadMetrics,
}

impl Reloader {
    #[must_use]
    pub fn new(
        loader: Arc<Loader>,
        location: SourceLocation,
        store: Arc<DatasetStore>,
        cache: Arc<ViewCache>,
        load_timeout: Duration,
    ) -> Self {
        Self {
            loader,
            location,
            store,
            cache,
            load_timeout,
            running: Mutex::new(()),
            metrics: ReloadMetrics::default(),
        }
    }

    #[must_use]
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.try_lock().is_err()
    }

    pub async fn reload_now(&self) -> Result<ReloadOutcome, ReloadError> {
        let Ok(_running) = self.running.try_lock() else {
            return Err(ReloadError::AlreadyRunning);
        };
        info!(source = %self.location, "reload started");
        let loaded = match timeout(self.load_timeout, self.loader.load(&self.location)).await {
            Ok(result) => result,
            Err(_) => Err(LoadError::new(
                LoadErrorCode::SourceTimeout,
                format!("load exceeded {}ms", self.load_timeout.as_millis()),
            )),
        };
        let snapshot = match loaded {
            Ok(snapshot) => Arc::new(snapshot),
            Err(err) => {
                self.metrics.failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    code = err.code.as_str(),
                    error = %err,
                    current_version = ?self.store.version().map(DatasetVersion::get),
                    "reload failed; keeping current snapshot"
                );
                return Err(ReloadError::Load(err));
            }
        };

        let previous = self.store.version();
        if let Err(stale) = self.store.swap(Arc::clone(&snapshot)) {
            self.metrics.failures.fetch_add(1, Ordering::Relaxed);
            warn!(error = %stale, "loaded snapshot rejected");
            return Err(ReloadError::Stale(stale));
        }
        let evicted_views = self.cache.retain_version(snapshot.version()).await;

        let skipped_rows = snapshot.summary().skipped_rows;
        self.metrics.successes.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .last_skipped_rows
            .store(skipped_rows, Ordering::Relaxed);
        self.metrics
            .last_success_unix_secs
            .store(now_unix_secs(), Ordering::Relaxed);
        info!(
            version = snapshot.version().get(),
            previous = ?previous.map(DatasetVersion::get),
            records = snapshot.len(),
            skipped_rows,
            evicted_views,
            "reload succeeded"
        );
        Ok(ReloadOutcome {
            previous,
            version: snapshot.version(),
            records: snapshot.len(),
            skipped_rows,
            evicted_views,
        })
    }
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
