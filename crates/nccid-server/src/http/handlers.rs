// SPDX-License-Identifier: Apache-2.0

use crate::runtime::reloader::ReloadError;
use crate::services::{ServiceError, VersionedView};
use crate::telemetry::metrics_endpoint::render_metrics;
use crate::AppState;
use axum::extract::{Query, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use nccid_model::{CentreOrder, FilterParams};
use serde::Deserialize;
use serde_json::json;
use std::sync::atomic::Ordering;
use tracing::warn;

#[derive(Debug, Default, Deserialize)]
pub struct FilterQuery {
    pub group: Option<String>,
    pub covid_status: Option<String>,
}

impl FilterQuery {
    /// Absent parameters mean `all`; present ones must be in the closed set.
    fn parse(&self) -> Result<FilterParams, ServiceError> {
        let group = self.group.as_deref().unwrap_or("all");
        let covid_status = self.covid_status.as_deref().unwrap_or("all");
        nccid_query::parse_filters(group, covid_status).map_err(ServiceError::from)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct CentreOverviewQuery {
    pub group: Option<String>,
    pub covid_status: Option<String>,
    pub order: Option<String>,
}

impl CentreOverviewQuery {
    /// Absent `order` sorts by centre name.
    fn parse(&self) -> Result<(FilterParams, CentreOrder), ServiceError> {
        let filters = FilterQuery {
            group: self.group.clone(),
            covid_status: self.covid_status.clone(),
        }
        .parse()?;
        let order = match self.order.as_deref() {
            None => CentreOrder::default(),
            Some(raw) => CentreOrder::parse(raw)
                .map_err(|e| ServiceError::from(nccid_query::QueryError::from(e)))?,
        };
        Ok((filters, order))
    }
}

/// Absent or blank `centre` covers every centre.
#[derive(Debug, Default, Deserialize)]
pub struct CentreQuery {
    pub centre: Option<String>,
}

fn make_request_id(state: &AppState) -> String {
    let id = state.request_id_seed.fetch_add(1, Ordering::Relaxed);
    format!("req-{id:016x}")
}

fn with_request_id(mut response: Response, request_id: &str) -> Response {
    if let Ok(v) = HeaderValue::from_str(request_id) {
        response.headers_mut().insert("x-request-id", v);
    }
    response
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
    (
        status,
        Json(json!({"error": {"code": code, "message": message}})),
    )
        .into_response()
}

fn service_error_response(err: &ServiceError) -> Response {
    let status = match err {
        ServiceError::NotReady => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Query(q) => match q.code {
            nccid_query::QueryErrorCode::InvalidFilter => StatusCode::BAD_REQUEST,
            nccid_query::QueryErrorCode::DivisionByZeroSubset => StatusCode::UNPROCESSABLE_ENTITY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        },
    };
    error_response(status, err.code(), &err.to_string())
}

fn view_response(result: Result<VersionedView, ServiceError>) -> Response {
    match result {
        Ok(versioned) => {
            let mut resp = Json(versioned.view.as_ref()).into_response();
            if let Ok(v) = HeaderValue::from_str(&versioned.version.get().to_string()) {
                resp.headers_mut().insert("x-dataset-version", v);
            }
            resp
        }
        Err(err) => service_error_response(&err),
    }
}

pub(crate) async fn healthz_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    with_request_id((StatusCode::OK, "ok").into_response(), &request_id)
}

pub(crate) async fn readyz_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let resp = if state.service.store().is_ready() {
        (StatusCode::OK, "ready").into_response()
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not-ready").into_response()
    };
    with_request_id(resp, &request_id)
}

pub(crate) async fn metrics_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let body = render_metrics(&state.service).await;
    let resp = (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    )
        .into_response();
    with_request_id(resp, &request_id)
}

pub(crate) async fn dataset_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let resp = match state.service.dataset_status() {
        Some(status) => Json(status).into_response(),
        None => service_error_response(&ServiceError::NotReady),
    };
    with_request_id(resp, &request_id)
}

pub(crate) async fn age_handler(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let request_id = make_request_id(&state);
    let resp = match query.parse() {
        Ok(filters) => view_response(state.service.get_age_breakdown(filters).await),
        Err(err) => service_error_response(&err),
    };
    with_request_id(resp, &request_id)
}

pub(crate) async fn ethnicity_handler(
    State(state): State<AppState>,
    Query(query): Query<FilterQuery>,
) -> Response {
    let request_id = make_request_id(&state);
    let resp = match query.parse() {
        Ok(filters) => view_response(state.service.get_ethnicity_breakdown(filters).await),
        Err(err) => service_error_response(&err),
    };
    with_request_id(resp, &request_id)
}

pub(crate) async fn gender_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let resp = view_response(state.service.get_gender_summary().await);
    with_request_id(resp, &request_id)
}

pub(crate) async fn patients_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let resp = view_response(state.service.get_patient_counts().await);
    with_request_id(resp, &request_id)
}

pub(crate) async fn centres_handler(
    State(state): State<AppState>,
    Query(query): Query<CentreOverviewQuery>,
) -> Response {
    let request_id = make_request_id(&state);
    let resp = match query.parse() {
        Ok((filters, order)) => {
            view_response(state.service.get_centre_overview(filters, order).await)
        }
        Err(err) => service_error_response(&err),
    };
    with_request_id(resp, &request_id)
}

pub(crate) async fn centre_timeline_handler(
    State(state): State<AppState>,
    Query(query): Query<CentreQuery>,
) -> Response {
    let request_id = make_request_id(&state);
    let resp = view_response(state.service.get_centre_timeline(query.centre).await);
    with_request_id(resp, &request_id)
}

pub(crate) async fn completeness_handler(
    State(state): State<AppState>,
    Query(query): Query<CentreQuery>,
) -> Response {
    let request_id = make_request_id(&state);
    let resp = view_response(state.service.get_field_completeness(query.centre).await);
    with_request_id(resp, &request_id)
}

pub(crate) async fn refresh_handler(State(state): State<AppState>) -> Response {
    let request_id = make_request_id(&state);
    let resp = match state.service.refresh_now().await {
        Ok(outcome) => Json(outcome).into_response(),
        Err(err) => {
            warn!(code = err.code(), error = %err, request_id, "manual refresh failed");
            let status = match err {
                ReloadError::AlreadyRunning | ReloadError::Stale(_) => StatusCode::CONFLICT,
                ReloadError::Load(_) => StatusCode::BAD_GATEWAY,
            };
            error_response(status, err.code(), &err.to_string())
        }
    };
    with_request_id(resp, &request_id)
}
