// SPDX-License-Identifier: Apache-2.0

use crate::options::QueryOptions;
use crate::select;
use nccid_model::{
    CovidFilter, DatasetSnapshot, Ethnicity, FilterParams, GroupFilter, Histogram,
    HistogramBucket, View, MAX_AGE_YEARS,
};

fn title_suffix(filters: &FilterParams) -> String {
    let group = match filters.group {
        GroupFilter::All => "All data",
        GroupFilter::Training => "Training set",
        GroupFilter::Validation => "Validation set",
    };
    let status = match filters.covid_status {
        CovidFilter::All => "All patients",
        CovidFilter::Positive => "Positive patients",
        CovidFilter::Negative => "Negative patients",
    };
    format!("{group}, {status}")
}

fn bucket_label(lo: u64, width: u64) -> String {
    if width == 1 {
        lo.to_string()
    } else {
        format!("{}-{}", lo, lo + width - 1)
    }
}

/// Fixed-width histogram from zero up to the bucket holding the oldest
/// patient. Empty buckets in between are kept. Ages outside
/// `0..=MAX_AGE_YEARS` count as missing, which bounds the bucket count.
#[must_use]
pub fn compute_age_breakdown(
    snapshot: &DatasetSnapshot,
    filters: &FilterParams,
    options: &QueryOptions,
) -> View {
    let width = u64::from(options.age_bucket_width.max(1));
    let mut counts: Vec<u64> = Vec::new();
    let mut missing = 0_u64;
    for record in select(snapshot, filters) {
        let Some(age) = record
            .age
            .filter(|a| a.is_finite() && (0.0..=MAX_AGE_YEARS).contains(a))
        else {
            missing += 1;
            continue;
        };
        let idx = (age as u64 / width) as usize;
        if idx >= counts.len() {
            counts.resize(idx + 1, 0);
        }
        counts[idx] += 1;
    }
    let buckets = counts
        .into_iter()
        .enumerate()
        .map(|(idx, count)| HistogramBucket::new(bucket_label(idx as u64 * width, width), count))
        .collect();
    View::Histogram(Histogram {
        title: format!("Age Distribution of Patients, {}", title_suffix(filters)),
        buckets,
        missing,
    })
}

/// Always six buckets, in category order, zeros included.
#[must_use]
pub fn compute_ethnicity_breakdown(snapshot: &DatasetSnapshot, filters: &FilterParams) -> View {
    let mut counts = [0_u64; Ethnicity::ORDERED.len()];
    for record in select(snapshot, filters) {
        counts[record.ethnicity as usize] += 1;
    }
    let buckets = Ethnicity::ORDERED
        .iter()
        .zip(counts)
        .map(|(e, count)| HistogramBucket::new(e.label(), count))
        .collect();
    View::Histogram(Histogram {
        title: format!(
            "Ethnicity Distribution of Patients, {}",
            title_suffix(filters)
        ),
        buckets,
        missing: 0,
    })
}
