// SPDX-License-Identifier: Apache-2.0

use crate::load_error::LoadError;
use nccid_model::{
    CovidStatus, EpochDay, Ethnicity, Group, Record, Sex, ValidationError, MAX_AGE_YEARS,
};

pub const COL_PSEUDONYM: &str = "Pseudonym";
pub const COL_GROUP: &str = "group";
pub const COL_COVID_STATUS: &str = "filename_covid_status";
pub const COL_AGE: &str = "age_update";
pub const COL_SEX: &str = "sex_update";
pub const COL_ETHNICITY: &str = "ethnicity";
pub const COL_SUBMITTING_CENTRE: &str = "SubmittingCentre";
pub const COL_EARLIEST_DATE: &str = "filename_earliest_date";
pub const COL_LATEST_DATE: &str = "filename_latest_date";

/// Parsed patient table before it is wrapped into a snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedTable {
    pub records: Vec<Record>,
    pub total_rows: u64,
    pub skipped_rows: u64,
}

struct Columns {
    width: usize,
    pseudonym: usize,
    group: usize,
    covid_status: Option<usize>,
    age: Option<usize>,
    sex: Option<usize>,
    ethnicity: Option<usize>,
    submitting_centre: Option<usize>,
    earliest_date: Option<usize>,
    latest_date: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let find = |name: &str| headers.iter().position(|h| h.trim() == name);
        let required = |name: &str| {
            find(name).ok_or_else(|| {
                LoadError::invalid(format!("patient table is missing required column {name:?}"))
            })
        };
        Ok(Self {
            width: headers.len(),
            pseudonym: required(COL_PSEUDONYM)?,
            group: required(COL_GROUP)?,
            covid_status: find(COL_COVID_STATUS),
            age: find(COL_AGE),
            sex: find(COL_SEX),
            ethnicity: find(COL_ETHNICITY),
            submitting_centre: find(COL_SUBMITTING_CENTRE),
            earliest_date: find(COL_EARLIEST_DATE),
            latest_date: find(COL_LATEST_DATE),
        })
    }
}

fn field(row: &csv::StringRecord, idx: Option<usize>) -> &str {
    idx.and_then(|i| row.get(i)).unwrap_or("").trim()
}

fn parse_age(raw: &str) -> Result<Option<f64>, ValidationError> {
    if raw.is_empty() {
        return Ok(None);
    }
    match raw.parse::<f64>() {
        Ok(age) if age.is_finite() && (0.0..=MAX_AGE_YEARS).contains(&age) => Ok(Some(age)),
        _ => Err(ValidationError(format!(
            "age must be a number between 0 and {MAX_AGE_YEARS} (got {raw:?})"
        ))),
    }
}

fn parse_row(row: &csv::StringRecord, cols: &Columns) -> Result<Record, ValidationError> {
    if row.len() != cols.width {
        return Err(ValidationError(format!(
            "expected {} fields, found {}",
            cols.width,
            row.len()
        )));
    }
    let pseudonym = field(row, Some(cols.pseudonym));
    if pseudonym.is_empty() {
        return Err(ValidationError("missing pseudonym".to_string()));
    }
    let centre = field(row, cols.submitting_centre);
    Ok(Record {
        pseudonym: pseudonym.to_string(),
        group: Group::parse(field(row, Some(cols.group)))?,
        covid_status: CovidStatus::parse(field(row, cols.covid_status))?,
        age: parse_age(field(row, cols.age))?,
        sex: Sex::parse(field(row, cols.sex))?,
        ethnicity: Ethnicity::parse(field(row, cols.ethnicity))?,
        submitting_centre: (!centre.is_empty()).then(|| centre.to_string()),
        earliest_date: EpochDay::parse(field(row, cols.earliest_date)).ok(),
        latest_date: EpochDay::parse(field(row, cols.latest_date)).ok(),
    })
}

/// Header-driven, permissive parse. Bad rows are skipped and counted; only
/// a structurally unusable table (no header, missing required column) fails.
pub fn parse_patient_table(bytes: &[u8]) -> Result<ParsedTable, LoadError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|e| LoadError::invalid(format!("patient table header unreadable: {e}")))?
        .clone();
    let cols = Columns::from_headers(&headers)?;

    let mut out = ParsedTable::default();
    for (line, row) in reader.records().enumerate() {
        out.total_rows += 1;
        let parsed = row
            .map_err(|e| ValidationError(e.to_string()))
            .and_then(|row| parse_row(&row, &cols));
        match parsed {
            Ok(record) => out.records.push(record),
            Err(err) => {
                out.skipped_rows += 1;
                tracing::debug!(row = line + 1, error = %err, "skipping malformed row");
            }
        }
    }
    Ok(out)
}
