// SPDX-License-Identifier: Apache-2.0

use crate::index::patient_table_path;
use crate::load_error::{LoadError, LoadErrorCode};
use crate::location::SourceLocation;
use crate::parse::parse_patient_table;
use crate::source::{DatasetSource, RoutingSource};
use crate::source_s3::RemoteSourceConfig;
use nccid_model::{sha256_hex, DatasetSnapshot, DatasetVersion, LoadSummary};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, instrument, warn};

/// Fetches and parses the patient table into a fresh snapshot.
///
/// The only state is the version counter: every successful load gets a
/// version strictly greater than any earlier load from this `Loader`.
pub struct Loader {
    source: Arc<dyn DatasetSource>,
    last_version: AtomicU64,
}

impl Loader {
    #[must_use]
    pub fn new(source: Arc<dyn DatasetSource>) -> Self {
        Self {
            source,
            last_version: AtomicU64::new(0),
        }
    }

    #[must_use]
    pub fn from_remote_config(remote: RemoteSourceConfig) -> Self {
        Self::new(Arc::new(RoutingSource::from_config(remote)))
    }

    /// Version handed to the most recent successful load, if any.
    #[must_use]
    pub fn last_version(&self) -> Option<DatasetVersion> {
        match self.last_version.load(Ordering::Acquire) {
            0 => None,
            v => Some(DatasetVersion(v)),
        }
    }

    #[instrument(name = "dataset_load", skip(self), fields(source = %location, backend = self.source.backend_tag()))]
    pub async fn load(&self, location: &SourceLocation) -> Result<DatasetSnapshot, LoadError> {
        let first = self.source.fetch(location).await?;
        let (table_location, bytes) = match patient_table_path(&first)? {
            Some(path) => {
                let table = location.sibling(&path)?;
                info!(index = %location, table = %table, "resolved patient table from index");
                let bytes = self.source.fetch(&table).await?;
                (table, bytes)
            }
            None => (location.clone(), first),
        };

        let parsed = parse_patient_table(&bytes)?;
        if parsed.skipped_rows > 0 {
            warn!(
                skipped_rows = parsed.skipped_rows,
                total_rows = parsed.total_rows,
                "malformed rows skipped"
            );
        }
        if parsed.records.is_empty() {
            return Err(LoadError::new(
                LoadErrorCode::EmptyResult,
                format!(
                    "{table_location} produced no usable records ({} rows, {} skipped)",
                    parsed.total_rows, parsed.skipped_rows
                ),
            ));
        }

        let summary = LoadSummary {
            total_rows: parsed.total_rows,
            skipped_rows: parsed.skipped_rows,
            source: table_location.to_string(),
            content_sha256: sha256_hex(&bytes),
        };
        let version = DatasetVersion(self.last_version.fetch_add(1, Ordering::AcqRel) + 1);
        let snapshot = DatasetSnapshot::new(version, now_unix_secs(), parsed.records, summary);
        info!(
            version = version.get(),
            records = snapshot.len(),
            skipped_rows = snapshot.summary().skipped_rows,
            "dataset loaded"
        );
        Ok(snapshot)
    }
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
