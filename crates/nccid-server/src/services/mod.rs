// SPDX-License-Identifier: Apache-2.0

use crate::cache::view_cache::ViewCache;
use crate::config::ViewCacheConfig;
use crate::dataset_store::DatasetStore;
use crate::runtime::reloader::{ReloadError, ReloadOutcome, Reloader};
use nccid_model::{
    CacheKey, CentreOrder, DatasetVersion, FilterParams, QueryKind, View, ViewRequest,
};
use nccid_query::{QueryError, QueryOptions};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    /// No snapshot has been published yet.
    NotReady,
    Query(QueryError),
}

impl ServiceError {
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotReady => "not_ready",
            Self::Query(e) => e.code.as_str(),
        }
    }
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotReady => write!(f, "not_ready: dataset has not been loaded yet"),
            Self::Query(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for ServiceError {}

impl From<QueryError> for ServiceError {
    fn from(value: QueryError) -> Self {
        Self::Query(value)
    }
}

/// A cached view together with the snapshot version it was computed from.
#[derive(Debug, Clone)]
pub struct VersionedView {
    pub version: DatasetVersion,
    pub view: Arc<View>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DatasetStatus {
    pub version: DatasetVersion,
    pub loaded_at_unix_secs: u64,
    pub records: usize,
    pub total_rows: u64,
    pub skipped_rows: u64,
    pub source: String,
    pub content_sha256: String,
}

/// Read-side entry point: every view goes snapshot -> cache key -> cache.
pub struct DashboardService {
    store: Arc<DatasetStore>,
    cache: Arc<ViewCache>,
    reloader: Arc<Reloader>,
    ttl: ViewCacheConfig,
    options: QueryOptions,
}

impl DashboardService {
    #[must_use]
    pub fn new(
        store: Arc<DatasetStore>,
        cache: Arc<ViewCache>,
        reloader: Arc<Reloader>,
        ttl: ViewCacheConfig,
        options: QueryOptions,
    ) -> Self {
        Self {
            store,
            cache,
            reloader,
            ttl,
            options,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Arc<DatasetStore> {
        &self.store
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ViewCache> {
        &self.cache
    }

    #[must_use]
    pub fn reloader(&self) -> &Arc<Reloader> {
        &self.reloader
    }

    pub async fn view(
        &self,
        kind: QueryKind,
        filters: FilterParams,
    ) -> Result<VersionedView, ServiceError> {
        self.view_request(ViewRequest::new(kind, filters)).await
    }

    pub async fn view_request(&self, request: ViewRequest) -> Result<VersionedView, ServiceError> {
        let snapshot = self.store.current().ok_or(ServiceError::NotReady)?;
        let ttl = self.ttl.ttl_for(request.kind);
        let key = CacheKey::for_request(request, snapshot.version());
        let options = self.options;
        let view = self
            .cache
            .get(key.clone(), ttl, || {
                nccid_query::compute(&key.request, &snapshot, &options)
            })
            .await?;
        Ok(VersionedView {
            version: snapshot.version(),
            view,
        })
    }

    pub async fn get_age_breakdown(
        &self,
        filters: FilterParams,
    ) -> Result<VersionedView, ServiceError> {
        self.view(QueryKind::AgeBreakdown, filters).await
    }

    pub async fn get_ethnicity_breakdown(
        &self,
        filters: FilterParams,
    ) -> Result<VersionedView, ServiceError> {
        self.view(QueryKind::EthnicityBreakdown, filters).await
    }

    pub async fn get_gender_summary(&self) -> Result<VersionedView, ServiceError> {
        self.view(QueryKind::GenderSummary, FilterParams::default())
            .await
    }

    pub async fn get_patient_counts(&self) -> Result<VersionedView, ServiceError> {
        self.view(QueryKind::PatientCounts, FilterParams::default())
            .await
    }

    pub async fn get_centre_overview(
        &self,
        filters: FilterParams,
        order: CentreOrder,
    ) -> Result<VersionedView, ServiceError> {
        self.view_request(ViewRequest::new(QueryKind::CentreOverview, filters).with_order(order))
            .await
    }

    /// `None` covers every centre.
    pub async fn get_centre_timeline(
        &self,
        centre: Option<String>,
    ) -> Result<VersionedView, ServiceError> {
        let request = ViewRequest::new(QueryKind::CentreTimeline, FilterParams::default())
            .with_centre(centre);
        self.view_request(request).await
    }

    pub async fn get_field_completeness(
        &self,
        centre: Option<String>,
    ) -> Result<VersionedView, ServiceError> {
        let request = ViewRequest::new(QueryKind::FieldCompleteness, FilterParams::default())
            .with_centre(centre);
        self.view_request(request).await
    }

    /// Load time of the published snapshot, UTC seconds.
    #[must_use]
    pub fn last_update(&self) -> Option<u64> {
        self.store.current().map(|s| s.loaded_at_unix_secs())
    }

    #[must_use]
    pub fn dataset_status(&self) -> Option<DatasetStatus> {
        let snapshot = self.store.current()?;
        let summary = snapshot.summary();
        Some(DatasetStatus {
            version: snapshot.version(),
            loaded_at_unix_secs: snapshot.loaded_at_unix_secs(),
            records: snapshot.len(),
            total_rows: summary.total_rows,
            skipped_rows: summary.skipped_rows,
            source: summary.source.clone(),
            content_sha256: summary.content_sha256.clone(),
        })
    }

    pub async fn refresh_now(&self) -> Result<ReloadOutcome, ReloadError> {
        tracing::info!("manual refresh requested");
        self.reloader.reload_now().await
    }
}
