// SPDX-License-Identifier: Apache-2.0

use crate::config::ReloadConfig;
use crate::runtime::reloader::{ReloadError, Reloader};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};
use tracing::{error, info, warn};

/// A tick fired later than `grace` after its scheduled instant.
#[must_use]
pub fn is_misfire(scheduled: Instant, fired: Instant, grace: Duration) -> bool {
    fired.saturating_duration_since(scheduled) > grace
}

/// Fires `reload_now` every `interval`, first tick one interval from now.
/// An interval too large to schedule logs an error and the task ends
/// without ticking.
///
/// Each reload runs on its own task so the ticker keeps its cadence; a tick
/// that lands while a reload is still running is skipped as a missed tick.
pub fn spawn_reload_scheduler(reloader: Arc<Reloader>, config: &ReloadConfig) -> JoinHandle<()> {
    let period = config.interval;
    let grace = config.misfire_grace;
    tokio::spawn(async move {
        let Some(start) = Instant::now().checked_add(period) else {
            error!(
                interval_secs = period.as_secs(),
                "reload interval cannot be scheduled; scheduler not started"
            );
            return;
        };
        let mut ticker = interval_at(start, period);
        info!(
            interval_secs = period.as_secs(),
            grace_secs = grace.as_secs(),
            "reload scheduler started"
        );
        loop {
            let scheduled = ticker.tick().await;
            let fired = Instant::now();
            if is_misfire(scheduled, fired, grace) {
                reloader.metrics.misfires.fetch_add(1, Ordering::Relaxed);
                warn!(
                    late_ms = fired.saturating_duration_since(scheduled).as_millis() as u64,
                    "reload tick misfired past grace window; skipped"
                );
                continue;
            }
            let reloader = Arc::clone(&reloader);
            tokio::spawn(async move {
                match reloader.reload_now().await {
                    Err(ReloadError::AlreadyRunning) => {
                        reloader.metrics.missed_ticks.fetch_add(1, Ordering::Relaxed);
                        warn!("reload tick skipped: previous reload still running");
                    }
                    // outcome and failure are logged by the reloader
                    Ok(_) | Err(_) => {}
                }
            });
        }
    })
}
