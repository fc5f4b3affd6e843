// SPDX-License-Identifier: Apache-2.0

use criterion::{criterion_group, criterion_main, Criterion};
use nccid_model::{
    CacheKey, DatasetSnapshot, DatasetVersion, Ethnicity, FilterParams, Group, LoadSummary,
    QueryKind, Record, Sex,
};
use nccid_query::{QueryError, QueryOptions};
use nccid_server::ViewCache;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::runtime::Runtime;

fn snapshot(n: usize) -> DatasetSnapshot {
    let records = (0..n)
        .map(|i| {
            let group = if i % 5 == 0 { Group::Validation } else { Group::Training };
            Record::new(format!("Covid{i}"), group)
                .with_age((18 + i % 70) as f64)
                .with_sex(if i % 2 == 0 { Sex::Male } else { Sex::Female })
                .with_ethnicity(Ethnicity::ORDERED[i % Ethnicity::ORDERED.len()])
        })
        .collect();
    DatasetSnapshot::new(DatasetVersion(1), 0, records, LoadSummary::default())
}

fn bench_view_cache(c: &mut Criterion) {
    let rt = Runtime::new().expect("runtime");
    let snapshot = snapshot(20_000);
    let options = QueryOptions::default();
    let ttl = Duration::from_secs(180);
    let cache = ViewCache::default();
    let key = CacheKey::new(
        QueryKind::AgeBreakdown,
        FilterParams::default(),
        snapshot.version(),
    );
    rt.block_on(async {
        cache
            .get(key.clone(), ttl, || {
                nccid_query::compute(&key.request, &snapshot, &options)
            })
            .await
            .expect("warm");
    });

    c.bench_function("view_cache_hit", |b| {
        b.iter(|| {
            rt.block_on(async {
                cache
                    .get(key.clone(), ttl, || {
                        Err::<_, QueryError>(QueryError::empty_subset("unused"))
                    })
                    .await
                    .expect("hit")
            })
        })
    });

    // every iteration uses a fresh version, so each lookup computes
    let version = AtomicU64::new(1);
    c.bench_function("view_cache_miss_age_breakdown_20k", |b| {
        b.iter(|| {
            let v = DatasetVersion(version.fetch_add(1, Ordering::Relaxed) + 1);
            let key = CacheKey::new(QueryKind::AgeBreakdown, FilterParams::default(), v);
            rt.block_on(async {
                cache
                    .get(key.clone(), ttl, || {
                        nccid_query::compute(&key.request, &snapshot, &options)
                    })
                    .await
                    .expect("miss")
            })
        })
    });
}

criterion_group!(benches, bench_view_cache);
criterion_main!(benches);
