// SPDX-License-Identifier: Apache-2.0

#![forbid(unsafe_code)]

use nccid_model::QueryKind;
use nccid_query::QueryOptions;
use nccid_server::{
    build_router, spawn_reload_scheduler, validate_startup_config_contract, AppState,
    DashboardService, DatasetStore, ReloadConfig, Reloader, ServerConfig, ViewCache,
    ViewCacheConfig,
};
use nccid_store::{Loader, RemoteSourceConfig, RetryPolicy, SourceLocation, DEFAULT_S3_ENDPOINT};
use std::env;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn env_bool(name: &str, default: bool) -> bool {
    env::var(name)
        .ok()
        .and_then(|v| match v.as_str() {
            "1" | "true" | "TRUE" | "yes" | "YES" => Some(true),
            "0" | "false" | "FALSE" | "no" | "NO" => Some(false),
            _ => None,
        })
        .unwrap_or(default)
}

fn env_u64(name: &str, default: u64) -> u64 {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(default)
}

fn env_usize(name: &str, default: usize) -> usize {
    env::var(name)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .unwrap_or(default)
}

fn env_duration_ms(name: &str, default_ms: u64) -> Duration {
    Duration::from_millis(env_u64(name, default_ms))
}

fn env_duration_secs(name: &str, default_secs: u64) -> Duration {
    Duration::from_secs(env_u64(name, default_secs))
}

fn view_cache_config_from_env() -> ViewCacheConfig {
    let mut cfg = ViewCacheConfig {
        default_ttl: env_duration_secs("NCCID_VIEW_TTL_SECS", 180),
        ..ViewCacheConfig::default()
    };
    for kind in QueryKind::ALL {
        let name = format!("NCCID_VIEW_TTL_{}_SECS", kind.as_str().to_ascii_uppercase());
        if let Some(secs) = env::var(&name).ok().and_then(|v| v.parse::<u64>().ok()) {
            cfg.per_kind.insert(kind, Duration::from_secs(secs));
        }
    }
    cfg
}

async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => {}
                    _ = sigint.recv() => {}
                }
            }
            _ => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env_bool("NCCID_LOG_JSON", true) {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), String> {
    init_tracing();

    let server_cfg = ServerConfig {
        bind: env::var("NCCID_BIND").unwrap_or_else(|_| ServerConfig::default().bind),
        shutdown_drain: env_duration_ms("NCCID_SHUTDOWN_DRAIN_MS", 5_000),
    };
    let reload_cfg = ReloadConfig {
        source: env::var("NCCID_SOURCE").unwrap_or_else(|_| ReloadConfig::default().source),
        interval: env_duration_secs("NCCID_RELOAD_INTERVAL_HOURS", 4).saturating_mul(3600),
        misfire_grace: env_duration_secs("NCCID_RELOAD_MISFIRE_GRACE_SECS", 900),
        load_timeout: env_duration_secs("NCCID_LOAD_TIMEOUT_SECS", 120),
    };
    let cache_cfg = view_cache_config_from_env();
    let query_options = QueryOptions {
        age_bucket_width: u32::try_from(env_u64("NCCID_AGE_BUCKET_WIDTH", 5)).unwrap_or(u32::MAX),
        ..QueryOptions::default()
    };
    let remote_cfg = RemoteSourceConfig {
        s3_endpoint: env::var("NCCID_S3_ENDPOINT")
            .unwrap_or_else(|_| DEFAULT_S3_ENDPOINT.to_string()),
        bearer_token: env::var("NCCID_S3_BEARER").ok().filter(|t| !t.is_empty()),
        retry: RetryPolicy {
            max_attempts: env_usize("NCCID_STORE_RETRY_ATTEMPTS", 4),
            base_backoff_ms: env_u64("NCCID_STORE_RETRY_BASE_MS", 120),
            max_backoff_ms: env_u64("NCCID_STORE_RETRY_MAX_MS", 5_000),
        },
        allow_private_hosts: env_bool("NCCID_S3_ALLOW_PRIVATE_HOSTS", false),
        ..RemoteSourceConfig::default()
    };
    validate_startup_config_contract(&reload_cfg, &cache_cfg, &query_options, &remote_cfg)?;
    let location = SourceLocation::parse(&reload_cfg.source).map_err(|e| e.to_string())?;

    let store = Arc::new(DatasetStore::new());
    let cache = Arc::new(ViewCache::default());
    let reloader = Arc::new(Reloader::new(
        Arc::new(Loader::from_remote_config(remote_cfg)),
        location,
        Arc::clone(&store),
        Arc::clone(&cache),
        reload_cfg.load_timeout,
    ));
    let service = Arc::new(DashboardService::new(
        store,
        cache,
        Arc::clone(&reloader),
        cache_cfg,
        query_options,
    ));

    // Not fatal: the store stays unready and the scheduler retries.
    if let Err(e) = reloader.reload_now().await {
        error!(error = %e, "initial dataset load failed; serving not-ready until a reload succeeds");
    }
    let scheduler = spawn_reload_scheduler(Arc::clone(&reloader), &reload_cfg);

    let app = build_router(AppState::new(service));
    let listener = TcpListener::bind(&server_cfg.bind)
        .await
        .map_err(|e| format!("bind {} failed: {e}", server_cfg.bind))?;
    info!(bind = %server_cfg.bind, source = %reloader.location(), "nccid-server listening");

    let drain = server_cfg.shutdown_drain;
    let scheduler = scheduler.abort_handle();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            wait_for_shutdown_signal().await;
            // No new reloads once shutdown starts, then let in-flight requests finish.
            scheduler.abort();
            info!(drain_ms = drain.as_millis() as u64, "shutdown signal received; draining");
            tokio::time::sleep(drain).await;
        })
        .await
        .map_err(|e| format!("server failed: {e}"))
}
