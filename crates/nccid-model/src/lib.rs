// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Shared types for the NCCID dashboard core: patient records, immutable
//! dataset snapshots, the closed filter set, and the views derived from them.

mod filters;
mod record;
mod snapshot;
mod view;

pub use filters::{CovidFilter, FilterParams, GroupFilter};
pub use record::{
    CovidStatus, EpochDay, Ethnicity, Group, Record, Sex, ValidationError, MAX_AGE_YEARS,
};
pub use snapshot::{sha256_hex, DatasetSnapshot, DatasetVersion, LoadSummary};
pub use view::{
    CacheKey, CentreOrder, Histogram, HistogramBucket, QueryKind, SummaryTable, TableRow, View,
    ViewRequest,
};

pub const CRATE_NAME: &str = "nccid-model";
