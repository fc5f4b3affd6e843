// SPDX-License-Identifier: Apache-2.0

use crate::record::Record;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{Display, Formatter};

#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Monotonic snapshot identifier. Starts at 1.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct DatasetVersion(pub u64);

impl DatasetVersion {
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl Display for DatasetVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Outcome counters of one load, kept with the snapshot it produced.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoadSummary {
    pub total_rows: u64,
    pub skipped_rows: u64,
    pub source: String,
    pub content_sha256: String,
}

/// Immutable, versioned copy of the patient table.
///
/// Snapshots are shared behind `Arc` and replaced wholesale; nothing hands out
/// a mutable reference after construction.
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSnapshot {
    version: DatasetVersion,
    loaded_at_unix_secs: u64,
    records: Vec<Record>,
    summary: LoadSummary,
}

impl DatasetSnapshot {
    #[must_use]
    pub fn new(
        version: DatasetVersion,
        loaded_at_unix_secs: u64,
        records: Vec<Record>,
        summary: LoadSummary,
    ) -> Self {
        Self {
            version,
            loaded_at_unix_secs,
            records,
            summary,
        }
    }

    #[must_use]
    pub const fn version(&self) -> DatasetVersion {
        self.version
    }

    #[must_use]
    pub const fn loaded_at_unix_secs(&self) -> u64 {
        self.loaded_at_unix_secs
    }

    #[must_use]
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn summary(&self) -> &LoadSummary {
        &self.summary
    }
}
