// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Serving core of the NCCID dashboard: the published dataset snapshot, the
//! derived-view cache, the reload scheduler and a small JSON HTTP surface.

use axum::routing::{get, post};
use axum::Router;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

mod cache;
mod config;
mod dataset_store;
mod effect_adapters;
mod http;
mod runtime;
mod services;
mod store;
mod telemetry;

pub use cache::view_cache::{ViewCache, ViewCacheMetrics, ViewCacheStats};
pub use config::{
    validate_startup_config_contract, ReloadConfig, ServerConfig, ViewCacheConfig, DEFAULT_SOURCE,
    MAX_CONFIG_DURATION,
};
pub use dataset_store::{DatasetStore, StaleSnapshot};
pub use effect_adapters::clock_adapters::{Clock, ManualClock, SystemClock};
pub use runtime::reloader::{ReloadError, ReloadMetrics, ReloadOutcome, Reloader};
pub use runtime::scheduler::{is_misfire, spawn_reload_scheduler};
pub use services::{DashboardService, DatasetStatus, ServiceError, VersionedView};
pub use store::fake::FakeSource;
pub use telemetry::metrics_endpoint::render_metrics;

pub const CRATE_NAME: &str = "nccid-server";

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DashboardService>,
    pub(crate) request_id_seed: Arc<AtomicU64>,
}

impl AppState {
    #[must_use]
    pub fn new(service: Arc<DashboardService>) -> Self {
        Self {
            service,
            request_id_seed: Arc::new(AtomicU64::new(1)),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(http::handlers::healthz_handler))
        .route("/readyz", get(http::handlers::readyz_handler))
        .route("/metrics", get(http::handlers::metrics_handler))
        .route("/v1/dataset", get(http::handlers::dataset_handler))
        .route("/v1/views/age", get(http::handlers::age_handler))
        .route("/v1/views/ethnicity", get(http::handlers::ethnicity_handler))
        .route("/v1/views/gender", get(http::handlers::gender_handler))
        .route("/v1/views/patients", get(http::handlers::patients_handler))
        .route("/v1/views/centres", get(http::handlers::centres_handler))
        .route(
            "/v1/views/centres/timeline",
            get(http::handlers::centre_timeline_handler),
        )
        .route("/v1/views/completeness", get(http::handlers::completeness_handler))
        .route("/v1/admin/refresh", post(http::handlers::refresh_handler))
        .with_state(state)
}
