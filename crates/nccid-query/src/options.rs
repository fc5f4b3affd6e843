// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

pub const DEFAULT_AGE_BUCKET_WIDTH: u32 = 5;
pub const RECENT_CUTOFF_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryOptions {
    /// Width of one age bucket in years. Zero is treated as one.
    pub age_bucket_width: u32,
    pub recent_cutoff_days: i64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            age_bucket_width: DEFAULT_AGE_BUCKET_WIDTH,
            recent_cutoff_days: RECENT_CUTOFF_DAYS,
        }
    }
}
