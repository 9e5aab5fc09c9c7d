//! Error line extraction and classification from raw job logs.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::report::{ErrorCategory, ErrorEntry};

/// Substring that marks a log line as an error.
pub const ERROR_MARKER: &str = "Error:";

/// Maximum entries kept per job.
pub const MAX_ERRORS_PER_JOB: usize = 5;

static TIMESTAMP_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}T\d{2}:\d{2}:\d{2}(?:\.\d+)?Z\s*").unwrap()
});

/// Pull the first [`MAX_ERRORS_PER_JOB`] error lines out of a job log, in
/// log order.
pub fn extract(job_name: &str, log_text: &str) -> Vec<ErrorEntry> {
    log_text
        .lines()
        .map(clean_line)
        .filter(|line| line.contains(ERROR_MARKER))
        .take(MAX_ERRORS_PER_JOB)
        .map(|line| ErrorEntry {
            job_name: job_name.to_string(),
            message_line: line.to_string(),
            category: classify_category(line),
        })
        .collect()
}

/// Strip the runner timestamp prefix and surrounding whitespace.
fn clean_line(line: &str) -> &str {
    let line = line.trim();
    match TIMESTAMP_REGEX.find(line) {
        Some(m) => line[m.end()..].trim(),
        None => line,
    }
}

/// Classify error category from text.
pub fn classify_category(text: &str) -> ErrorCategory {
    let lower = text.to_lowercase();
    if lower.contains("test")
        || lower.contains("assertion")
        || lower.contains("panicked")
        || lower.contains("expected")
    {
        ErrorCategory::Test
    } else if lower.contains("compile") || lower.contains("cannot find") {
        ErrorCategory::Compile
    } else if lower.contains("lint") || lower.contains("analyze") || lower.contains("warning") {
        ErrorCategory::Lint
    } else if lower.contains("timeout") || lower.contains("timed out") {
        ErrorCategory::Timeout
    } else {
        ErrorCategory::Runtime
    }
}
