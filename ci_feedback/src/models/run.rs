//! ci.run — A normalized CI run and the jobs it produced.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Placeholder substituted for any field a source could not provide.
pub const UNKNOWN: &str = "Unknown";

/// Number of commit SHA characters shown in reports.
pub const SHORT_SHA_LEN: usize = 8;

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    Completed,
}

impl RunStatus {
    /// Map a GitHub `status` string; anything still pending counts as queued.
    pub fn from_api(value: Option<&str>) -> Self {
        match value {
            Some("completed") => Self::Completed,
            Some("in_progress") => Self::InProgress,
            _ => Self::Queued,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Terminal outcome of a run or job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Conclusion {
    Success,
    Failure,
    Cancelled,
    Unknown,
}

impl Conclusion {
    /// Map a conclusion string from the API or a webhook payload.
    pub fn from_api(value: Option<&str>) -> Self {
        match value.map(str::to_ascii_lowercase).as_deref() {
            Some("success") => Self::Success,
            Some("failure") | Some("failed") => Self::Failure,
            Some("cancelled") => Self::Cancelled,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failure => "failure",
            Self::Cancelled => "cancelled",
            Self::Unknown => "unknown",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure)
    }
}

impl fmt::Display for Conclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed CI run. A new poll or push yields a new value; existing
/// values are never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunRecord {
    pub id: String,
    pub repository: String,
    pub workflow_name: String,
    pub branch: String,
    pub commit_sha: String,
    pub status: RunStatus,
    pub conclusion: Conclusion,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

impl RunRecord {
    /// Commit SHA cut to its display width. Shorter values, including the
    /// `Unknown` placeholder, come back unchanged.
    pub fn short_sha(&self) -> &str {
        match self.commit_sha.char_indices().nth(SHORT_SHA_LEN) {
            Some((idx, _)) => &self.commit_sha[..idx],
            None => &self.commit_sha,
        }
    }

    /// Numeric run id, if this run came from the CI API rather than a
    /// notification without one.
    pub fn api_id(&self) -> Option<u64> {
        self.id.parse().ok()
    }
}

/// A job as listed by the CI API, before its log is fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobSummary {
    pub id: u64,
    pub name: String,
    pub conclusion: Conclusion,
}

/// A failed job together with its (possibly truncated) log text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobRecord {
    pub name: String,
    pub conclusion: Conclusion,
    /// `None` when the log fetch failed.
    pub log_text: Option<String>,
}
