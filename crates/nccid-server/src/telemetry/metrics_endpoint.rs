// SPDX-License-Identifier: Apache-2.0

use crate::services::DashboardService;
use std::fmt::Write as _;
use std::sync::atomic::Ordering;

const METRIC_SUBSYSTEM: &str = "dashboard";
const METRIC_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prometheus text exposition of reload, store and cache counters.
pub async fn render_metrics(service: &DashboardService) -> String {
    let reload = &service.reloader().metrics;
    let cache = service.cache().stats().await;
    let version = service.store().version().map_or(0, |v| v.get());
    let ready = u64::from(service.store().is_ready());

    let samples: [(&str, &str, u64); 16] = [
        ("nccid_reload_success_total", "counter", reload.successes.load(Ordering::Relaxed)),
        ("nccid_reload_failure_total", "counter", reload.failures.load(Ordering::Relaxed)),
        ("nccid_reload_missed_tick_total", "counter", reload.missed_ticks.load(Ordering::Relaxed)),
        ("nccid_reload_misfire_total", "counter", reload.misfires.load(Ordering::Relaxed)),
        ("nccid_reload_last_skipped_rows", "gauge", reload.last_skipped_rows.load(Ordering::Relaxed)),
        (
            "nccid_reload_last_success_unix_seconds",
            "gauge",
            reload.last_success_unix_secs.load(Ordering::Relaxed),
        ),
        ("nccid_dataset_version", "gauge", version),
        ("nccid_dataset_ready", "gauge", ready),
        ("nccid_view_cache_hits_total", "counter", cache.hits),
        ("nccid_view_cache_misses_total", "counter", cache.misses),
        ("nccid_view_cache_computations_total", "counter", cache.computations),
        ("nccid_view_cache_compute_failures_total", "counter", cache.compute_failures),
        ("nccid_view_cache_evictions_total", "counter", cache.evictions),
        ("nccid_view_cache_stale_bypass_total", "counter", cache.stale_bypasses),
        ("nccid_view_cache_keys", "gauge", cache.keys as u64),
        (
            "nccid_dataset_last_update_unix_seconds",
            "gauge",
            service.last_update().unwrap_or(0),
        ),
    ];

    let mut body = String::new();
    for (name, kind, value) in samples {
        let _ = writeln!(body, "# TYPE {name} {kind}");
        let _ = writeln!(
            body,
            "{name}{{subsystem=\"{METRIC_SUBSYSTEM}\",version=\"{METRIC_VERSION}\"}} {value}"
        );
    }
    body
}
