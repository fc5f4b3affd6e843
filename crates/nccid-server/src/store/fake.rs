// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;
use nccid_store::{DatasetSource, LoadError, LoadErrorCode, SourceLocation};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

/// Scripted in-memory source for service and scheduler tests.
///
/// Serves `table` for every location, optionally after `delay`. Flip
/// `fail` to make fetches report the source as unreachable.
pub struct FakeSource {
    pub table: Mutex<Vec<u8>>,
    pub fail: AtomicBool,
    pub fetch_calls: AtomicU64,
    pub delay: Duration,
}

impl Default for FakeSource {
    fn default() -> Self {
        Self {
            table: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            fetch_calls: AtomicU64::new(0),
            delay: Duration::ZERO,
        }
    }
}

impl FakeSource {
    #[must_use]
    pub fn with_table(table: impl Into<Vec<u8>>) -> Self {
        Self {
            table: Mutex::new(table.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub async fn set_table(&self, table: impl Into<Vec<u8>>) {
        *self.table.lock().await = table.into();
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl DatasetSource for FakeSource {
    fn backend_tag(&self) -> &'static str {
        "fake"
    }

    async fn fetch(&self, location: &SourceLocation) -> Result<Vec<u8>, LoadError> {
        self.fetch_calls.fetch_add(1, Ordering::Relaxed);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(LoadError::new(
                LoadErrorCode::SourceUnreachable,
                format!("fake source down for {location}"),
            ));
        }
        Ok(self.table.lock().await.clone())
    }
}
