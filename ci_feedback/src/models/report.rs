//! Feedback report, extracted errors, and the status record consumers poll.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::run::RunRecord;

/// Rough classification of an extracted error line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Compile,
    Test,
    Lint,
    Timeout,
    Runtime,
}

impl ErrorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Compile => "compile",
            Self::Test => "test",
            Self::Lint => "lint",
            Self::Timeout => "timeout",
            Self::Runtime => "runtime",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One error line pulled out of a job log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorEntry {
    pub job_name: String,
    pub message_line: String,
    pub category: ErrorCategory,
}

/// A composed feedback document. Each generation replaces the previous one.
#[derive(Debug, Clone)]
pub struct FeedbackReport {
    pub generated_at: DateTime<Utc>,
    pub run: RunRecord,
    pub errors: Vec<ErrorEntry>,
    pub body: String,
}

/// Processing marker written next to the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusRecord {
    pub state: String,
    #[serde(rename = "timestamp")]
    pub generated_at: DateTime<Utc>,
    pub ready: bool,
}

impl StatusRecord {
    pub fn ready(state: impl Into<String>, generated_at: DateTime<Utc>) -> Self {
        Self {
            state: state.into(),
            generated_at,
            ready: true,
        }
    }
}
