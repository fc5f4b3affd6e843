// SPDX-License-Identifier: Apache-2.0

use nccid_model::QueryKind;
use nccid_query::QueryOptions;
use nccid_store::RemoteSourceConfig;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

pub const DEFAULT_SOURCE: &str = "data/latest.csv";

/// Upper bound for every configured duration (reload interval, load
/// timeout, view TTLs).
pub const MAX_CONFIG_DURATION: Duration = Duration::from_secs(30 * 24 * 3600);

#[derive(Debug, Clone, Serialize)]
pub struct ReloadConfig {
    pub source: String,
    pub interval: Duration,
    pub misfire_grace: Duration,
    pub load_timeout: Duration,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            source: DEFAULT_SOURCE.to_string(),
            interval: Duration::from_secs(4 * 3600),
            misfire_grace: Duration::from_secs(900),
            load_timeout: Duration::from_secs(120),
        }
    }
}

/// TTL per query kind. Kinds without an override use `default_ttl`.
#[derive(Debug, Clone, Serialize)]
pub struct ViewCacheConfig {
    pub default_ttl: Duration,
    pub per_kind: BTreeMap<QueryKind, Duration>,
}

impl Default for ViewCacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(180),
            per_kind: BTreeMap::new(),
        }
    }
}

impl ViewCacheConfig {
    #[must_use]
    pub fn ttl_for(&self, kind: QueryKind) -> Duration {
        self.per_kind.get(&kind).copied().unwrap_or(self.default_ttl)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub bind: String,
    pub shutdown_drain: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            shutdown_drain: Duration::from_millis(5_000),
        }
    }
}

pub fn validate_startup_config_contract(
    reload: &ReloadConfig,
    cache: &ViewCacheConfig,
    query: &QueryOptions,
    remote: &RemoteSourceConfig,
) -> Result<(), String> {
    if reload.source.trim().is_empty() {
        return Err("source location must not be empty".to_string());
    }
    if reload.interval.is_zero() || reload.load_timeout.is_zero() {
        return Err("reload interval and load timeout must be > 0".to_string());
    }
    if reload.interval > MAX_CONFIG_DURATION || reload.load_timeout > MAX_CONFIG_DURATION {
        return Err(format!(
            "reload interval and load timeout must be <= {}s",
            MAX_CONFIG_DURATION.as_secs()
        ));
    }
    if reload.misfire_grace >= reload.interval {
        return Err("misfire grace must be shorter than the reload interval".to_string());
    }
    if cache.default_ttl.is_zero() {
        return Err("view ttl must be > 0".to_string());
    }
    if cache.default_ttl > MAX_CONFIG_DURATION {
        return Err(format!("view ttl must be <= {}s", MAX_CONFIG_DURATION.as_secs()));
    }
    if let Some((kind, _)) = cache.per_kind.iter().find(|(_, ttl)| ttl.is_zero()) {
        return Err(format!("view ttl for {} must be > 0", kind.as_str()));
    }
    if let Some((kind, _)) = cache
        .per_kind
        .iter()
        .find(|(_, ttl)| **ttl > MAX_CONFIG_DURATION)
    {
        return Err(format!(
            "view ttl for {} must be <= {}s",
            kind.as_str(),
            MAX_CONFIG_DURATION.as_secs()
        ));
    }
    if query.age_bucket_width == 0 {
        return Err("age bucket width must be > 0".to_string());
    }
    if remote.retry.max_attempts == 0 {
        return Err("store retry attempts must be > 0".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate(reload: &ReloadConfig, cache: &ViewCacheConfig) -> Result<(), String> {
        validate_startup_config_contract(
            reload,
            cache,
            &QueryOptions::default(),
            &RemoteSourceConfig::default(),
        )
    }

    #[test]
    fn defaults_pass_validation() {
        validate(&ReloadConfig::default(), &ViewCacheConfig::default()).expect("defaults");
    }

    #[test]
    fn zero_durations_are_rejected() {
        let reload = ReloadConfig {
            load_timeout: Duration::ZERO,
            ..ReloadConfig::default()
        };
        assert!(validate(&reload, &ViewCacheConfig::default()).is_err());

        let mut cache = ViewCacheConfig::default();
        cache.per_kind.insert(QueryKind::GenderSummary, Duration::ZERO);
        let err = validate(&ReloadConfig::default(), &cache).expect_err("zero kind ttl");
        assert!(err.contains("gender_summary"));
    }

    #[test]
    fn unrepresentable_durations_are_rejected() {
        let reload = ReloadConfig {
            interval: Duration::MAX,
            ..ReloadConfig::default()
        };
        let err = validate(&reload, &ViewCacheConfig::default()).expect_err("huge interval");
        assert!(err.contains("reload interval"));

        let huge_ttl = ViewCacheConfig {
            default_ttl: Duration::from_secs(u64::MAX),
            ..ViewCacheConfig::default()
        };
        assert!(validate(&ReloadConfig::default(), &huge_ttl).is_err());

        let mut cache = ViewCacheConfig::default();
        cache
            .per_kind
            .insert(QueryKind::AgeBreakdown, MAX_CONFIG_DURATION + Duration::from_secs(1));
        let err = validate(&ReloadConfig::default(), &cache).expect_err("huge kind ttl");
        assert!(err.contains("age_breakdown"));

        let at_limit = ViewCacheConfig {
            default_ttl: MAX_CONFIG_DURATION,
            ..ViewCacheConfig::default()
        };
        validate(&ReloadConfig::default(), &at_limit).expect("limit is inclusive");
    }

    #[test]
    fn grace_must_fit_inside_interval() {
        let reload = ReloadConfig {
            interval: Duration::from_secs(600),
            misfire_grace: Duration::from_secs(900),
            ..ReloadConfig::default()
        };
        let err = validate(&reload, &ViewCacheConfig::default()).expect_err("grace too long");
        assert!(err.contains("misfire grace"));
    }

    #[test]
    fn per_kind_override_wins() {
        let mut cache = ViewCacheConfig::default();
        cache
            .per_kind
            .insert(QueryKind::PatientCounts, Duration::from_secs(30));
        assert_eq!(cache.ttl_for(QueryKind::PatientCounts), Duration::from_secs(30));
        assert_eq!(cache.ttl_for(QueryKind::AgeBreakdown), Duration::from_secs(180));
    }
}
