// SPDX-License-Identifier: Apache-2.0

use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum LoadErrorCode {
    SourceUnreachable,
    SourceTimeout,
    EmptyResult,
    InvalidSource,
}

impl LoadErrorCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SourceUnreachable => "source_unreachable",
            Self::SourceTimeout => "source_timeout",
            Self::EmptyResult => "empty_result",
            Self::InvalidSource => "invalid_source",
        }
    }
}

/// Whole-load failure. Individual bad rows never surface as a `LoadError`;
/// they are counted in `LoadSummary::skipped_rows`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadError {
    pub code: LoadErrorCode,
    pub message: String,
}

impl LoadError {
    #[must_use]
    pub fn new(code: LoadErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::new(LoadErrorCode::SourceUnreachable, message)
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::new(LoadErrorCode::InvalidSource, message)
    }
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for LoadError {}
