//! Feedback report rendering.
//!
//! Composition is pure: the same run, errors and timestamp always render
//! the same body, and only the header line depends on the timestamp.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::models::report::{ErrorCategory, ErrorEntry, FeedbackReport};
use crate::models::run::RunRecord;

/// Maximum error entries listed in one report, across all jobs.
pub const MAX_REPORT_ERRORS: usize = 10;

const NO_ERRORS_PLACEHOLDER: &str =
    "_No error lines were extracted from the job logs. Open the run URL for the full output._";

const VERIFICATION_CHECKLIST: &str = "\
1. Read every error above and locate the failing code or test.
2. Reproduce each failing job locally before changing code.
3. Fix the root cause; do not skip, silence or delete failing checks.
4. Run the full test suite and static analysis locally.
5. Push the fix and confirm the next CI run on this branch passes.
";

/// Render a report for `run` from the errors extracted across its jobs.
///
/// `entries` must be in job arrival order; at most [`MAX_REPORT_ERRORS`]
/// are kept.
pub fn compose(
    run: &RunRecord,
    entries: Vec<ErrorEntry>,
    generated_at: DateTime<Utc>,
) -> FeedbackReport {
    let errors: Vec<ErrorEntry> = entries.into_iter().take(MAX_REPORT_ERRORS).collect();

    let mut body = header_line(generated_at);
    body.push('\n');

    body.push_str("## Run\n\n");
    body.push_str(&format!("- **Repository**: {}\n", run.repository));
    body.push_str(&format!("- **Run ID**: {}\n", run.id));
    body.push_str(&format!("- **Workflow**: {}\n", run.workflow_name));
    body.push_str(&format!("- **Branch**: {}\n", run.branch));
    body.push_str(&format!("- **Commit**: {}\n", run.short_sha()));
    body.push_str(&format!("- **Status**: {}\n", run.status));
    body.push_str(&format!("- **Conclusion**: {}\n", run.conclusion));
    body.push_str(&format!("- **Run URL**: {}\n", run.url));
    body.push_str(&format!("- **Created**: {}\n", run.created_at.to_rfc3339()));
    body.push('\n');

    body.push_str("## Errors Detected\n\n");
    if errors.is_empty() {
        body.push_str(NO_ERRORS_PLACEHOLDER);
        body.push('\n');
    } else {
        for entry in &errors {
            body.push_str(&format!("- {} — {}\n", entry.job_name, entry.message_line));
        }
        body.push('\n');

        body.push_str("## Error Categories\n\n");
        for (category, count) in category_counts(&errors) {
            body.push_str(&format!("- {category}: {count}\n"));
        }
    }
    body.push('\n');

    body.push_str("## Verification Checklist\n\n");
    body.push_str(VERIFICATION_CHECKLIST);

    FeedbackReport {
        generated_at,
        run: run.clone(),
        errors,
        body,
    }
}

/// Render the short note an editor integration shows on a push notification.
pub fn render_notification(
    message: &str,
    report_name: &str,
    generated_at: DateTime<Utc>,
) -> String {
    format!(
        "# CI Failure Detected\n\n{message}\n\n\
         **Action Required**: Read {report_name} and fix the failing checks.\n\n\
         Time: {}\n",
        generated_at.format("%Y-%m-%d %H:%M UTC")
    )
}

fn header_line(generated_at: DateTime<Utc>) -> String {
    format!(
        "# CI Failure Report - {}\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    )
}

fn category_counts(errors: &[ErrorEntry]) -> BTreeMap<ErrorCategory, usize> {
    let mut counts = BTreeMap::new();
    for entry in errors {
        *counts.entry(entry.category).or_insert(0) += 1;
    }
    counts
}
