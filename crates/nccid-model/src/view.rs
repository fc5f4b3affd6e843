// SPDX-License-Identifier: Apache-2.0

use crate::filters::FilterParams;
use crate::record::ValidationError;
use crate::snapshot::DatasetVersion;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
    AgeBreakdown,
    EthnicityBreakdown,
    GenderSummary,
    PatientCounts,
    CentreOverview,
    CentreTimeline,
    FieldCompleteness,
}

impl QueryKind {
    pub const ALL: [Self; 7] = [
        Self::AgeBreakdown,
        Self::EthnicityBreakdown,
        Self::GenderSummary,
        Self::PatientCounts,
        Self::CentreOverview,
        Self::CentreTimeline,
        Self::FieldCompleteness,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AgeBreakdown => "age_breakdown",
            Self::EthnicityBreakdown => "ethnicity_breakdown",
            Self::GenderSummary => "gender_summary",
            Self::PatientCounts => "patient_counts",
            Self::CentreOverview => "centre_overview",
            Self::CentreTimeline => "centre_timeline",
            Self::FieldCompleteness => "field_completeness",
        }
    }

    /// Summary tables ignore the UI filters.
    #[must_use]
    pub const fn uses_filters(self) -> bool {
        matches!(
            self,
            Self::AgeBreakdown | Self::EthnicityBreakdown | Self::CentreOverview
        )
    }

    /// Kinds that can be narrowed to one submitting centre.
    #[must_use]
    pub const fn uses_centre(self) -> bool {
        matches!(self, Self::CentreTimeline | Self::FieldCompleteness)
    }

    #[must_use]
    pub const fn uses_order(self) -> bool {
        matches!(self, Self::CentreOverview)
    }
}

/// Row order of the centre overview. Centre names sort ascending; the
/// other columns sort descending.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord,
)]
#[serde(rename_all = "snake_case")]
pub enum CentreOrder {
    #[default]
    Centre,
    FirstSubmission,
    LatestSubmission,
    Patients,
}

impl CentreOrder {
    pub const ALL: [Self; 4] = [
        Self::Centre,
        Self::FirstSubmission,
        Self::LatestSubmission,
        Self::Patients,
    ];

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let s = raw.trim();
        Self::ALL.into_iter().find(|o| o.as_str() == s).ok_or_else(|| {
            ValidationError(format!(
                "order must be one of centre, first_submission, latest_submission, patients (got {s:?})"
            ))
        })
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Centre => "centre",
            Self::FirstSubmission => "first_submission",
            Self::LatestSubmission => "latest_submission",
            Self::Patients => "patients",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HistogramBucket {
    pub label: String,
    pub count: u64,
}

impl HistogramBucket {
    #[must_use]
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Histogram {
    pub title: String,
    pub buckets: Vec<HistogramBucket>,
    /// Filtered records that could not be placed in any bucket.
    pub missing: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TableRow {
    pub label: String,
    pub cells: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SummaryTable {
    pub columns: Vec<String>,
    pub rows: Vec<TableRow>,
}

impl SummaryTable {
    #[must_use]
    pub fn cell(&self, row: &str, column: &str) -> Option<&str> {
        let col = self.columns.iter().position(|c| c == column)?;
        // column 0 is the row label
        let idx = col.checked_sub(1)?;
        self.rows
            .iter()
            .find(|r| r.label == row)
            .and_then(|r| r.cells.get(idx))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    Histogram(Histogram),
    Table(SummaryTable),
}

impl View {
    #[must_use]
    pub fn as_histogram(&self) -> Option<&Histogram> {
        match self {
            Self::Histogram(h) => Some(h),
            Self::Table(_) => None,
        }
    }

    #[must_use]
    pub fn as_table(&self) -> Option<&SummaryTable> {
        match self {
            Self::Table(t) => Some(t),
            Self::Histogram(_) => None,
        }
    }
}

/// Everything that determines a view's content apart from the snapshot.
///
/// Parameters a kind does not use are normalized away, so that a gender
/// summary requested with different UI filters shares one cache entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
pub struct ViewRequest {
    pub kind: QueryKind,
    pub filters: FilterParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub centre: Option<String>,
    pub order: CentreOrder,
}

impl ViewRequest {
    #[must_use]
    pub fn new(kind: QueryKind, filters: FilterParams) -> Self {
        let filters = if kind.uses_filters() {
            filters
        } else {
            FilterParams::default()
        };
        Self {
            kind,
            filters,
            centre: None,
            order: CentreOrder::default(),
        }
    }

    /// Blank names mean "all centres".
    #[must_use]
    pub fn with_centre(mut self, centre: Option<String>) -> Self {
        if self.kind.uses_centre() {
            self.centre = centre
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty());
        }
        self
    }

    #[must_use]
    pub fn with_order(mut self, order: CentreOrder) -> Self {
        if self.kind.uses_order() {
            self.order = order;
        }
        self
    }
}

/// Exact-match cache key. The dataset version makes entries of older
/// snapshots unreachable once a newer one is published.
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash)]
pub struct CacheKey {
    #[serde(flatten)]
    pub request: ViewRequest,
    pub version: DatasetVersion,
}

impl CacheKey {
    #[must_use]
    pub fn new(kind: QueryKind, filters: FilterParams, version: DatasetVersion) -> Self {
        Self::for_request(ViewRequest::new(kind, filters), version)
    }

    #[must_use]
    pub fn for_request(request: ViewRequest, version: DatasetVersion) -> Self {
        Self { request, version }
    }

    #[must_use]
    pub fn kind(&self) -> QueryKind {
        self.request.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::{CovidFilter, GroupFilter};

    #[test]
    fn cache_key_requires_exact_match() {
        let f = FilterParams::new(GroupFilter::Training, CovidFilter::Positive);
        let a = CacheKey::new(QueryKind::AgeBreakdown, f, DatasetVersion(1));
        let b = CacheKey::new(QueryKind::AgeBreakdown, f, DatasetVersion(2));
        let c = CacheKey::new(QueryKind::EthnicityBreakdown, f, DatasetVersion(1));
        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(a, CacheKey::new(QueryKind::AgeBreakdown, f, DatasetVersion(1)));
    }

    #[test]
    fn summary_kinds_ignore_filters_in_key() {
        let f = FilterParams::new(GroupFilter::Validation, CovidFilter::Negative);
        let a = CacheKey::new(QueryKind::GenderSummary, f, DatasetVersion(3));
        let b = CacheKey::new(QueryKind::GenderSummary, FilterParams::default(), DatasetVersion(3));
        assert_eq!(a, b);
    }

    #[test]
    fn unused_request_parameters_are_normalized() {
        let f = FilterParams::new(GroupFilter::Training, CovidFilter::Positive);
        let timeline = ViewRequest::new(QueryKind::CentreTimeline, f)
            .with_order(CentreOrder::Patients)
            .with_centre(Some(" RYJ ".into()));
        assert_eq!(timeline.filters, FilterParams::default());
        assert_eq!(timeline.order, CentreOrder::Centre);
        assert_eq!(timeline.centre.as_deref(), Some("RYJ"));

        let overview = ViewRequest::new(QueryKind::CentreOverview, f)
            .with_order(CentreOrder::Patients)
            .with_centre(Some("RYJ".into()));
        assert_eq!(overview.filters, f);
        assert_eq!(overview.order, CentreOrder::Patients);
        assert_eq!(overview.centre, None);

        let blank =
            ViewRequest::new(QueryKind::FieldCompleteness, f).with_centre(Some("  ".into()));
        assert_eq!(blank, ViewRequest::new(QueryKind::FieldCompleteness, f));
    }

    #[test]
    fn centre_order_parse_is_closed() {
        for order in CentreOrder::ALL {
            assert_eq!(CentreOrder::parse(order.as_str()).expect("known"), order);
        }
        assert!(CentreOrder::parse("Patients").is_err());
        assert!(CentreOrder::parse("").is_err());
    }

    #[test]
    fn table_cell_lookup_skips_label_column() {
        let t = SummaryTable {
            columns: vec!["Gender".into(), "Total".into()],
            rows: vec![TableRow {
                label: "Male".into(),
                cells: vec!["1 (100.0%)".into()],
            }],
        };
        assert_eq!(t.cell("Male", "Total"), Some("1 (100.0%)"));
        assert_eq!(t.cell("Male", "Gender"), None);
    }
}
