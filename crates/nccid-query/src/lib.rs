// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Stateless query engine. Every function here is a pure function of a
//! snapshot and its parameters; caching and versioning live elsewhere.

mod centres;
mod format;
mod histogram;
mod options;
mod query_error;
mod summary;

use nccid_model::{DatasetSnapshot, FilterParams, QueryKind, Record, View, ViewRequest};

pub use centres::{compute_centre_overview, compute_centre_timeline, compute_field_completeness};
pub use format::{count_with_share, numformat, rounded_percent};
pub use histogram::{compute_age_breakdown, compute_ethnicity_breakdown};
pub use options::{QueryOptions, DEFAULT_AGE_BUCKET_WIDTH, RECENT_CUTOFF_DAYS};
pub use query_error::{QueryError, QueryErrorCode};
pub use summary::{compute_gender_summary, compute_patient_counts};

pub const CRATE_NAME: &str = "nccid-query";

/// Records passing `filters`: group first, then covid status.
pub fn select<'a>(
    snapshot: &'a DatasetSnapshot,
    filters: &FilterParams,
) -> impl Iterator<Item = &'a Record> + 'a {
    let FilterParams {
        group,
        covid_status,
    } = *filters;
    snapshot
        .records()
        .iter()
        .filter(move |r| group.matches(r.group))
        .filter(move |r| covid_status.matches(r.covid_status))
}

/// Dispatch by kind. Each kind reads only the request parameters it uses.
pub fn compute(
    request: &ViewRequest,
    snapshot: &DatasetSnapshot,
    options: &QueryOptions,
) -> Result<View, QueryError> {
    let filters = &request.filters;
    let centre = request.centre.as_deref();
    match request.kind {
        QueryKind::AgeBreakdown => Ok(compute_age_breakdown(snapshot, filters, options)),
        QueryKind::EthnicityBreakdown => Ok(compute_ethnicity_breakdown(snapshot, filters)),
        QueryKind::GenderSummary => compute_gender_summary(snapshot),
        QueryKind::PatientCounts => Ok(compute_patient_counts(snapshot, options)),
        QueryKind::CentreOverview => Ok(compute_centre_overview(snapshot, filters, request.order)),
        QueryKind::CentreTimeline => Ok(compute_centre_timeline(snapshot, centre)),
        QueryKind::FieldCompleteness => compute_field_completeness(snapshot, centre),
    }
}

/// Strict parse of raw filter values into the closed set.
pub fn parse_filters(group: &str, covid_status: &str) -> Result<FilterParams, QueryError> {
    Ok(FilterParams::parse(group, covid_status)?)
}
