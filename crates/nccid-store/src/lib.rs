// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]
//! Loading of the NCCID patient table from local disk or object storage.

mod index;
mod load_error;
mod loader;
mod location;
mod parse;
mod retry;
mod source;
mod source_s3;

pub use index::{patient_table_path, PATIENT_ARCHIVE};
pub use load_error::{LoadError, LoadErrorCode};
pub use loader::Loader;
pub use location::SourceLocation;
pub use parse::{parse_patient_table, ParsedTable};
pub use retry::{BackoffPolicy, RetryPolicy};
pub use source::{DatasetSource, LocalFsSource, RoutingSource};
pub use source_s3::{RemoteSourceConfig, S3LikeSource, DEFAULT_S3_ENDPOINT};

pub const CRATE_NAME: &str = "nccid-store";
