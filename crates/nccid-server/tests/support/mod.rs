// SPDX-License-Identifier: Apache-2.0
#![allow(dead_code)]

use nccid_query::QueryOptions;
use nccid_server::{
    DashboardService, DatasetStore, FakeSource, ManualClock, Reloader, ViewCache, ViewCacheConfig,
};
use nccid_store::{Loader, SourceLocation};
use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

pub const HEADER: &str = "Pseudonym,group,filename_covid_status,age_update,sex_update,ethnicity,SubmittingCentre,filename_earliest_date\n";

/// Patient table with the given sex split; every row lands in training.
pub fn patient_table(male: usize, female: usize, unknown: usize) -> String {
    let mut out = HEADER.to_string();
    let mut n = 0;
    for (sex, count) in [("M", male), ("F", female), ("Unknown", unknown)] {
        for _ in 0..count {
            let status = if n % 2 == 0 { "True" } else { "False" };
            let age = 25 + n % 50;
            writeln!(out, "Covid{n},training,{status},{age},{sex},White,RYJ,2021-01-05")
                .expect("write row");
            n += 1;
        }
    }
    out
}

pub struct Harness {
    pub source: Arc<FakeSource>,
    pub store: Arc<DatasetStore>,
    pub cache: Arc<ViewCache>,
    pub clock: Arc<ManualClock>,
    pub reloader: Arc<Reloader>,
    pub service: Arc<DashboardService>,
}

pub fn harness(source: FakeSource, load_timeout: Duration) -> Harness {
    let source = Arc::new(source);
    let clock = Arc::new(ManualClock::default());
    let store = Arc::new(DatasetStore::new());
    let cache = Arc::new(ViewCache::new(clock.clone()));
    let loader = Arc::new(Loader::new(source.clone()));
    let location = SourceLocation::parse("local:fake/latest.csv").expect("location");
    let reloader = Arc::new(Reloader::new(
        loader,
        location,
        Arc::clone(&store),
        Arc::clone(&cache),
        load_timeout,
    ));
    let service = Arc::new(DashboardService::new(
        Arc::clone(&store),
        Arc::clone(&cache),
        Arc::clone(&reloader),
        ViewCacheConfig::default(),
        QueryOptions::default(),
    ));
    Harness {
        source,
        store,
        cache,
        clock,
        reloader,
        service,
    }
}

pub fn table_source(male: usize, female: usize, unknown: usize) -> FakeSource {
    FakeSource::with_table(patient_table(male, female, unknown))
}
