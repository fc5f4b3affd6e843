// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError(pub String);

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ValidationError {}

/// Cohort a patient was assigned to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Group {
    Training,
    Validation,
}

impl Group {
    pub const ALL: [Self; 2] = [Self::Training, Self::Validation];

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim() {
            "training" => Ok(Self::Training),
            "validation" => Ok(Self::Validation),
            other => Err(ValidationError(format!(
                "group must be one of training, validation (got {other:?})"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Training => "training",
            Self::Validation => "validation",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum CovidStatus {
    Positive,
    Negative,
    Unknown,
}

impl CovidStatus {
    /// Empty input is an unknown status, not a parse failure.
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim() {
            "" => Ok(Self::Unknown),
            "True" | "true" | "TRUE" | "1" => Ok(Self::Positive),
            "False" | "false" | "FALSE" | "0" => Ok(Self::Negative),
            other => Err(ValidationError(format!(
                "covid status must be a boolean (got {other:?})"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Sex {
    Male,
    Female,
    Unknown,
}

impl Sex {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw.trim() {
            "M" => Ok(Self::Male),
            "F" => Ok(Self::Female),
            "" | "Unknown" => Ok(Self::Unknown),
            other => Err(ValidationError(format!(
                "sex must be one of M, F, Unknown (got {other:?})"
            ))),
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Unknown => "Unknown",
        }
    }
}

/// Closed ethnicity category set. Declaration order is the display order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Ethnicity {
    Asian,
    Black,
    White,
    Multiple,
    Other,
    Unknown,
}

impl Ethnicity {
    pub const ORDERED: [Self; 6] = [
        Self::Asian,
        Self::Black,
        Self::White,
        Self::Multiple,
        Self::Other,
        Self::Unknown,
    ];

    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let s = raw.trim();
        if s.is_empty() {
            return Ok(Self::Unknown);
        }
        Self::ORDERED
            .into_iter()
            .find(|e| e.label().eq_ignore_ascii_case(s))
            .ok_or_else(|| ValidationError(format!("unknown ethnicity category {s:?}")))
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Asian => "Asian",
            Self::Black => "Black",
            Self::White => "White",
            Self::Multiple => "Multiple",
            Self::Other => "Other",
            Self::Unknown => "Unknown",
        }
    }
}

/// Oldest plausible patient age. Larger values are treated as data errors.
pub const MAX_AGE_YEARS: f64 = 150.0;

/// Days since 1970-01-01, parsed from a `YYYY-MM-DD` prefix.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct EpochDay(pub i64);

impl EpochDay {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let s = raw.trim();
        let date = s.get(..10).unwrap_or(s);
        let mut parts = date.splitn(3, '-');
        let (Some(y), Some(m), Some(d)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(ValidationError(format!("date must be YYYY-MM-DD (got {s:?})")));
        };
        let bad = |_| ValidationError(format!("date must be YYYY-MM-DD (got {s:?})"));
        let y: i64 = y.parse().map_err(bad)?;
        let m: u32 = m.parse().map_err(bad)?;
        let d: u32 = d.parse().map_err(bad)?;
        if !(1..=12).contains(&m) || !(1..=31).contains(&d) {
            return Err(ValidationError(format!("date out of range: {s:?}")));
        }
        Ok(Self(days_from_civil(y, m, d)))
    }

    #[must_use]
    pub fn from_unix_secs(secs: u64) -> Self {
        Self((secs / 86_400) as i64)
    }

    /// `YYYY-MM-DD` rendering.
    #[must_use]
    pub fn to_iso_date(self) -> String {
        let (y, m, d) = civil_from_days(self.0);
        format!("{y:04}-{m:02}-{d:02}")
    }
}

// Howard Hinnant's days_from_civil.
fn days_from_civil(y: i64, m: u32, d: u32) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = (if y >= 0 { y } else { y - 399 }) / 400;
    let yoe = y - era * 400;
    let m = i64::from(m);
    let doy = (153 * (if m > 2 { m - 3 } else { m + 9 }) + 2) / 5 + i64::from(d) - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(z: i64) -> (i64, u32, u32) {
    let z = z + 719_468;
    let era = (if z >= 0 { z } else { z - 146_096 }) / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = (doy - (153 * mp + 2) / 5 + 1) as u32;
    let m = (if mp < 10 { mp + 3 } else { mp - 9 }) as u32;
    let y = yoe + era * 400;
    (if m <= 2 { y + 1 } else { y }, m, d)
}

/// One patient row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub pseudonym: String,
    pub group: Group,
    pub covid_status: CovidStatus,
    pub age: Option<f64>,
    pub sex: Sex,
    pub ethnicity: Ethnicity,
    pub submitting_centre: Option<String>,
    pub earliest_date: Option<EpochDay>,
    pub latest_date: Option<EpochDay>,
}

impl Record {
    /// Minimal record, mostly for fixtures.
    #[must_use]
    pub fn new(pseudonym: impl Into<String>, group: Group) -> Self {
        Self {
            pseudonym: pseudonym.into(),
            group,
            covid_status: CovidStatus::Unknown,
            age: None,
            sex: Sex::Unknown,
            ethnicity: Ethnicity::Unknown,
            submitting_centre: None,
            earliest_date: None,
            latest_date: None,
        }
    }

    #[must_use]
    pub fn with_covid_status(mut self, status: CovidStatus) -> Self {
        self.covid_status = status;
        self
    }

    #[must_use]
    pub fn with_age(mut self, age: f64) -> Self {
        self.age = Some(age);
        self
    }

    #[must_use]
    pub fn with_sex(mut self, sex: Sex) -> Self {
        self.sex = sex;
        self
    }

    #[must_use]
    pub fn with_ethnicity(mut self, ethnicity: Ethnicity) -> Self {
        self.ethnicity = ethnicity;
        self
    }

    #[must_use]
    pub fn with_submitting_centre(mut self, centre: impl Into<String>) -> Self {
        self.submitting_centre = Some(centre.into());
        self
    }

    #[must_use]
    pub fn with_earliest_date(mut self, day: EpochDay) -> Self {
        self.earliest_date = Some(day);
        self
    }

    #[must_use]
    pub fn with_latest_date(mut self, day: EpochDay) -> Self {
        self.latest_date = Some(day);
        self
    }
}
