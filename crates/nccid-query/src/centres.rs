// SPDX-License-Identifier: Apache-2.0

use crate::format::numformat;
use crate::query_error::QueryError;
use crate::select;
use nccid_model::{
    CentreOrder, CovidStatus, DatasetSnapshot, EpochDay, Ethnicity, FilterParams, Record, Sex,
    SummaryTable, TableRow, View,
};
use std::collections::{BTreeMap, HashSet};

#[derive(Default)]
struct CentreTally<'a> {
    patients: HashSet<&'a str>,
    first: Option<EpochDay>,
    latest: Option<EpochDay>,
}

fn centre_of(record: &Record) -> Option<&str> {
    record
        .submitting_centre
        .as_deref()
        .filter(|c| !c.is_empty())
}

fn in_centre(record: &Record, centre: Option<&str>) -> bool {
    centre.map_or(true, |c| centre_of(record) == Some(c))
}

fn iso_or_blank(day: Option<EpochDay>) -> String {
    day.map(EpochDay::to_iso_date).unwrap_or_default()
}

fn table(columns: &[&str], rows: Vec<TableRow>) -> View {
    View::Table(SummaryTable {
        columns: columns.iter().map(|c| (*c).to_string()).collect(),
        rows,
    })
}

/// One row per submitting centre in the filtered selection: first and
/// latest submission dates and distinct patients. Records without a centre
/// are left out. A record without a latest date counts its earliest date.
#[must_use]
pub fn compute_centre_overview(
    snapshot: &DatasetSnapshot,
    filters: &FilterParams,
    order: CentreOrder,
) -> View {
    let mut by_centre: BTreeMap<&str, CentreTally<'_>> = BTreeMap::new();
    for record in select(snapshot, filters) {
        let Some(centre) = centre_of(record) else {
            continue;
        };
        let tally = by_centre.entry(centre).or_default();
        tally.patients.insert(&record.pseudonym);
        if let Some(day) = record.earliest_date {
            tally.first = Some(tally.first.map_or(day, |d| d.min(day)));
        }
        if let Some(day) = record.latest_date.or(record.earliest_date) {
            tally.latest = Some(tally.latest.map_or(day, |d| d.max(day)));
        }
    }

    // BTreeMap order is the centre order; the stable sort keeps it as the
    // tie-break for the descending columns.
    let mut entries: Vec<(&str, CentreTally<'_>)> = by_centre.into_iter().collect();
    match order {
        CentreOrder::Centre => {}
        CentreOrder::FirstSubmission => entries.sort_by(|a, b| b.1.first.cmp(&a.1.first)),
        CentreOrder::LatestSubmission => entries.sort_by(|a, b| b.1.latest.cmp(&a.1.latest)),
        CentreOrder::Patients => {
            entries.sort_by(|a, b| b.1.patients.len().cmp(&a.1.patients.len()));
        }
    }

    let rows = entries
        .into_iter()
        .map(|(centre, tally)| TableRow {
            label: centre.to_string(),
            cells: vec![
                iso_or_blank(tally.first),
                iso_or_blank(tally.latest),
                numformat(tally.patients.len() as u64),
            ],
        })
        .collect();
    table(
        &[
            "Submitting Centre/Site",
            "First Submission",
            "Latest Submission",
            "Patients",
        ],
        rows,
    )
}

/// Cumulative positive and negative record counts by first-submission date,
/// optionally for one centre. Records with unknown status or no date are
/// left out.
#[must_use]
pub fn compute_centre_timeline(snapshot: &DatasetSnapshot, centre: Option<&str>) -> View {
    let mut per_day: BTreeMap<EpochDay, (u64, u64)> = BTreeMap::new();
    for record in snapshot.records().iter().filter(|r| in_centre(r, centre)) {
        let Some(day) = record.earliest_date else {
            continue;
        };
        let slot = per_day.entry(day).or_default();
        match record.covid_status {
            CovidStatus::Positive => slot.0 += 1,
            CovidStatus::Negative => slot.1 += 1,
            CovidStatus::Unknown => {}
        }
    }

    let (mut positive, mut negative) = (0_u64, 0_u64);
    let rows = per_day
        .into_iter()
        .filter(|(_, (p, n))| p + n > 0)
        .map(|(day, (p, n))| {
            positive += p;
            negative += n;
            TableRow {
                label: day.to_iso_date(),
                cells: vec![numformat(positive), numformat(negative)],
            }
        })
        .collect();
    table(&["Date", "Positive", "Negative"], rows)
}

/// Fields whose fill rate is reported, with the patient-table column they
/// come from.
const COMPLETENESS_FIELDS: [(&str, fn(&Record) -> bool); 6] = [
    ("SubmittingCentre", |r: &Record| centre_of(r).is_some()),
    ("age_update", |r: &Record| r.age.is_some()),
    ("sex_update", |r: &Record| r.sex != Sex::Unknown),
    ("ethnicity", |r: &Record| r.ethnicity != Ethnicity::Unknown),
    ("filename_earliest_date", |r: &Record| r.earliest_date.is_some()),
    ("filename_latest_date", |r: &Record| r.latest_date.is_some()),
];

/// Share of covid-positive records with each field filled in, optionally
/// for one centre. Sorted by completeness, highest first, then field name.
pub fn compute_field_completeness(
    snapshot: &DatasetSnapshot,
    centre: Option<&str>,
) -> Result<View, QueryError> {
    let positives: Vec<&Record> = snapshot
        .records()
        .iter()
        .filter(|r| r.covid_status == CovidStatus::Positive && in_centre(r, centre))
        .collect();
    if positives.is_empty() {
        let subset = centre.map_or_else(
            || "positive patients".to_string(),
            |c| format!("positive patients at {c}"),
        );
        return Err(QueryError::empty_subset(&subset));
    }

    let total = positives.len() as u64;
    let mut filled: Vec<(&str, u64)> = COMPLETENESS_FIELDS
        .iter()
        .map(|(name, has)| (*name, positives.iter().filter(|r| has(r)).count() as u64))
        .collect();
    filled.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let rows = filled
        .into_iter()
        .map(|(name, n)| TableRow {
            label: name.to_string(),
            cells: vec![format!("{:.2}%", n as f64 / total as f64 * 100.0)],
        })
        .collect();
    Ok(table(&["Field", "Completeness"], rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use nccid_model::{DatasetVersion, Group, LoadSummary};

    fn snap(records: Vec<Record>) -> DatasetSnapshot {
        DatasetSnapshot::new(DatasetVersion(1), 0, records, LoadSummary::default())
    }

    fn day(raw: &str) -> EpochDay {
        EpochDay::parse(raw).expect("date")
    }

    fn submission(id: &str, centre: &str, first: &str, status: CovidStatus) -> Record {
        Record::new(id, Group::Training)
            .with_covid_status(status)
            .with_submitting_centre(centre)
            .with_earliest_date(day(first))
    }

    fn labels(view: &View) -> Vec<&str> {
        view.as_table()
            .expect("table")
            .rows
            .iter()
            .map(|r| r.label.as_str())
            .collect()
    }

    fn centres() -> DatasetSnapshot {
        snap(vec![
            submission("a1", "Alpha", "2020-04-01", CovidStatus::Positive)
                .with_latest_date(day("2020-06-01")),
            submission("a1", "Alpha", "2020-03-15", CovidStatus::Positive),
            submission("b1", "Bravo", "2020-05-01", CovidStatus::Negative),
            submission("b2", "Bravo", "2020-05-02", CovidStatus::Positive),
            submission("b3", "Bravo", "2020-07-09", CovidStatus::Negative),
            submission("c1", "Charlie", "2020-02-20", CovidStatus::Unknown),
            Record::new("orphan", Group::Training).with_covid_status(CovidStatus::Positive),
        ])
    }

    #[test]
    fn overview_summarises_each_centre() {
        let f = FilterParams::default();
        let view = compute_centre_overview(&centres(), &f, CentreOrder::Centre);
        let t = view.as_table().expect("table");
        assert_eq!(labels(&view), ["Alpha", "Bravo", "Charlie"]);
        assert_eq!(t.cell("Alpha", "First Submission"), Some("2020-03-15"));
        assert_eq!(t.cell("Alpha", "Latest Submission"), Some("2020-06-01"));
        assert_eq!(t.cell("Alpha", "Patients"), Some("1"));
        assert_eq!(t.cell("Bravo", "Latest Submission"), Some("2020-07-09"));
        assert_eq!(t.cell("Bravo", "Patients"), Some("3"));
    }

    #[test]
    fn overview_orders_non_name_columns_descending() {
        let s = centres();
        let f = FilterParams::default();
        let by = |order| labels(&compute_centre_overview(&s, &f, order)).join(",");
        assert_eq!(by(CentreOrder::Patients), "Bravo,Alpha,Charlie");
        assert_eq!(by(CentreOrder::FirstSubmission), "Bravo,Alpha,Charlie");
        assert_eq!(by(CentreOrder::LatestSubmission), "Bravo,Alpha,Charlie");
    }

    #[test]
    fn overview_respects_covid_filter() {
        let f = FilterParams::parse("all", "negative").expect("filters");
        let view = compute_centre_overview(&centres(), &f, CentreOrder::Centre);
        assert_eq!(labels(&view), ["Bravo"]);
        assert_eq!(view.as_table().and_then(|t| t.cell("Bravo", "Patients")), Some("2"));
    }

    #[test]
    fn timeline_accumulates_by_first_submission() {
        let view = compute_centre_timeline(&centres(), None);
        let t = view.as_table().expect("table");
        assert_eq!(
            labels(&view),
            ["2020-03-15", "2020-04-01", "2020-05-01", "2020-05-02", "2020-07-09"]
        );
        assert_eq!(t.cell("2020-04-01", "Positive"), Some("2"));
        assert_eq!(t.cell("2020-07-09", "Positive"), Some("3"));
        assert_eq!(t.cell("2020-07-09", "Negative"), Some("2"));
    }

    #[test]
    fn timeline_for_one_centre_and_unknown_centre() {
        let view = compute_centre_timeline(&centres(), Some("Bravo"));
        assert_eq!(labels(&view), ["2020-05-01", "2020-05-02", "2020-07-09"]);
        let t = view.as_table().expect("table");
        assert_eq!(t.cell("2020-05-02", "Positive"), Some("1"));
        assert_eq!(t.cell("2020-05-02", "Negative"), Some("1"));

        let none = compute_centre_timeline(&centres(), Some("Zulu"));
        assert!(none.as_table().expect("table").rows.is_empty());
    }

    #[test]
    fn completeness_covers_positive_records_only() {
        let view = compute_field_completeness(&centres(), None).expect("view");
        let t = view.as_table().expect("table");
        // four positives, one of them without a centre or a date
        assert_eq!(t.cell("SubmittingCentre", "Completeness"), Some("75.00%"));
        assert_eq!(t.cell("filename_earliest_date", "Completeness"), Some("75.00%"));
        assert_eq!(t.cell("filename_latest_date", "Completeness"), Some("25.00%"));
        assert_eq!(t.cell("age_update", "Completeness"), Some("0.00%"));
        assert_eq!(
            labels(&view),
            [
                "SubmittingCentre",
                "filename_earliest_date",
                "filename_latest_date",
                "age_update",
                "ethnicity",
                "sex_update",
            ]
        );
    }

    #[test]
    fn completeness_without_positives_is_an_empty_subset() {
        let err = compute_field_completeness(&centres(), Some("Charlie")).expect_err("none");
        assert_eq!(err.code, crate::QueryErrorCode::DivisionByZeroSubset);
        assert!(err.message.contains("Charlie"));

        let alpha = compute_field_completeness(&centres(), Some("Alpha")).expect("alpha");
        let t = alpha.as_table().expect("table");
        assert_eq!(t.cell("filename_latest_date", "Completeness"), Some("50.00%"));
    }
}
