// SPDX-License-Identifier: Apache-2.0

use crate::record::{CovidStatus, Group, Record, ValidationError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum GroupFilter {
    #[default]
    All,
    Training,
    Validation,
}

impl GroupFilter {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "all" => Ok(Self::All),
            "training" => Ok(Self::Training),
            "validation" => Ok(Self::Validation),
            other => Err(ValidationError(format!(
                "group filter must be one of all, training, validation (got {other:?})"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Training => "training",
            Self::Validation => "validation",
        }
    }

    #[must_use]
    pub fn matches(self, group: Group) -> bool {
        match self {
            Self::All => true,
            Self::Training => group == Group::Training,
            Self::Validation => group == Group::Validation,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum CovidFilter {
    #[default]
    All,
    Positive,
    Negative,
}

impl CovidFilter {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        match raw {
            "all" => Ok(Self::All),
            "positive" => Ok(Self::Positive),
            "negative" => Ok(Self::Negative),
            other => Err(ValidationError(format!(
                "covid status filter must be one of all, positive, negative (got {other:?})"
            ))),
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Positive => "positive",
            Self::Negative => "negative",
        }
    }

    /// Unknown statuses only pass `All`.
    #[must_use]
    pub fn matches(self, status: CovidStatus) -> bool {
        match self {
            Self::All => true,
            Self::Positive => status == CovidStatus::Positive,
            Self::Negative => status == CovidStatus::Negative,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub struct FilterParams {
    pub group: GroupFilter,
    pub covid_status: CovidFilter,
}

impl FilterParams {
    #[must_use]
    pub const fn new(group: GroupFilter, covid_status: CovidFilter) -> Self {
        Self {
            group,
            covid_status,
        }
    }

    /// Strict parse of raw caller values. No defaulting happens here.
    pub fn parse(group: &str, covid_status: &str) -> Result<Self, ValidationError> {
        Ok(Self {
            group: GroupFilter::parse(group)?,
            covid_status: CovidFilter::parse(covid_status)?,
        })
    }

    #[must_use]
    pub fn matches(&self, record: &Record) -> bool {
        self.group.matches(record.group) && self.covid_status.matches(record.covid_status)
    }

    #[must_use]
    pub fn canonical_string(&self) -> String {
        format!(
            "group={}&covid_status={}",
            self.group.as_str(),
            self.covid_status.as_str()
        )
    }
}
