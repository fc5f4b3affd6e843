// SPDX-License-Identifier: Apache-2.0

use crate::format::{count_with_share, numformat, rounded_percent};
use crate::options::QueryOptions;
use crate::query_error::QueryError;
use nccid_model::{
    CovidStatus, DatasetSnapshot, EpochDay, Group, Record, Sex, SummaryTable, TableRow, View,
};
use std::collections::HashSet;

#[derive(Debug, Default, Clone, Copy)]
struct SexCounts {
    male: u64,
    female: u64,
    unknown: u64,
}

impl SexCounts {
    fn tally<'a>(records: impl Iterator<Item = &'a Record>) -> Self {
        let mut out = Self::default();
        for r in records {
            match r.sex {
                Sex::Male => out.male += 1,
                Sex::Female => out.female += 1,
                Sex::Unknown => out.unknown += 1,
            }
        }
        out
    }

    fn column(self, subset: &str) -> Result<Vec<String>, QueryError> {
        let n = self.male + self.female + self.unknown;
        if n == 0 {
            return Err(QueryError::empty_subset(subset));
        }
        let n_mf = self.male + self.female;
        if n_mf == 0 {
            return Err(QueryError::empty_subset(&format!("{subset} (male+female)")));
        }
        // Each side is rounded on its own.
        let ratio = format!(
            "{}:{}",
            rounded_percent(self.male, n_mf),
            rounded_percent(self.female, n_mf)
        );
        Ok(vec![
            count_with_share(self.male, n),
            count_with_share(self.female, n),
            count_with_share(self.unknown, n),
            ratio,
        ])
    }
}

/// Gender table over the whole population and each group. UI filters do
/// not apply.
pub fn compute_gender_summary(snapshot: &DatasetSnapshot) -> Result<View, QueryError> {
    let records = snapshot.records();
    let columns = [
        ("Total", SexCounts::tally(records.iter())),
        (
            "Training set",
            SexCounts::tally(records.iter().filter(|r| r.group == Group::Training)),
        ),
        (
            "Validation set",
            SexCounts::tally(records.iter().filter(|r| r.group == Group::Validation)),
        ),
    ];
    let mut cells = Vec::with_capacity(columns.len());
    for (name, counts) in columns {
        cells.push(counts.column(name)?);
    }
    let labels = [
        Sex::Male.label(),
        Sex::Female.label(),
        Sex::Unknown.label(),
        "Male:Female ratio",
    ];
    let rows = labels
        .iter()
        .enumerate()
        .map(|(i, label)| TableRow {
            label: (*label).to_string(),
            cells: cells.iter().map(|col| col[i].clone()).collect(),
        })
        .collect();
    Ok(View::Table(SummaryTable {
        columns: ["Gender", "Total", "Training set", "Validation set"]
            .map(String::from)
            .to_vec(),
        rows,
    }))
}

#[derive(Default)]
struct GroupTally<'a> {
    patients: HashSet<&'a str>,
    positive: HashSet<&'a str>,
    negative: HashSet<&'a str>,
    recent: u64,
    centres: HashSet<&'a str>,
}

/// Headline patient counts per group, in the layout of the summary page.
#[must_use]
pub fn compute_patient_counts(snapshot: &DatasetSnapshot, options: &QueryOptions) -> View {
    let today = EpochDay::from_unix_secs(snapshot.loaded_at_unix_secs());
    let cutoff = EpochDay(today.0 - options.recent_cutoff_days);

    let mut all_patients: HashSet<&str> = HashSet::new();
    let mut all_centres: HashSet<&str> = HashSet::new();
    let mut training = GroupTally::default();
    let mut validation = GroupTally::default();
    for r in snapshot.records() {
        all_patients.insert(&r.pseudonym);
        let tally = match r.group {
            Group::Training => &mut training,
            Group::Validation => &mut validation,
        };
        tally.patients.insert(&r.pseudonym);
        match r.covid_status {
            CovidStatus::Positive => {
                tally.positive.insert(&r.pseudonym);
            }
            CovidStatus::Negative => {
                tally.negative.insert(&r.pseudonym);
            }
            CovidStatus::Unknown => {}
        }
        if r.earliest_date.is_some_and(|d| d >= cutoff) {
            tally.recent += 1;
        }
        if let Some(centre) = r.submitting_centre.as_deref().filter(|c| !c.is_empty()) {
            tally.centres.insert(centre);
            all_centres.insert(centre);
        }
    }

    let row = |label: String, total: usize, t: usize, v: usize| TableRow {
        label,
        cells: vec![
            numformat(total as u64),
            numformat(t as u64),
            numformat(v as u64),
        ],
    };
    let rows = vec![
        row(
            "Total number of patients".to_string(),
            all_patients.len(),
            training.patients.len(),
            validation.patients.len(),
        ),
        row(
            "Total number of positive patients".to_string(),
            training.positive.len() + validation.positive.len(),
            training.positive.len(),
            validation.positive.len(),
        ),
        row(
            "Total number of negative patients".to_string(),
            training.negative.len() + validation.negative.len(),
            training.negative.len(),
            validation.negative.len(),
        ),
        row(
            format!(
                "New patients added in the last {} days",
                options.recent_cutoff_days
            ),
            (training.recent + validation.recent) as usize,
            training.recent as usize,
            validation.recent as usize,
        ),
        row(
            "Number of submitting centres".to_string(),
            all_centres.len(),
            training.centres.len(),
            validation.centres.len(),
        ),
    ];
    View::Table(SummaryTable {
        columns: ["Patients", "Total", "Training", "Validation"]
            .map(String::from)
            .to_vec(),
        rows,
    })
}
