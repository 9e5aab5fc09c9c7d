//! Job log retrieval for failed jobs.
//!
//! Each log fetch stands alone: one unavailable log is recorded and skipped,
//! the rest of the run's failed jobs are still fetched.

use std::sync::Arc;

use crate::error::FeedbackError;
use crate::models::run::{JobRecord, RunRecord};
use crate::services::github_service::CiApi;

/// Default number of trailing log bytes kept per job.
pub const DEFAULT_LOG_TAIL_BYTES: usize = 10 * 1024;

#[derive(Clone)]
pub struct LogFetcher {
    api: Arc<dyn CiApi>,
    tail_bytes: usize,
}

impl LogFetcher {
    pub fn new(api: Arc<dyn CiApi>, tail_bytes: usize) -> Self {
        Self { api, tail_bytes }
    }

    /// Fetch logs for every failed job of `run`, in the order the API lists
    /// them. Jobs whose log could not be fetched carry `log_text: None`.
    pub async fn fetch_logs(&self, run: &RunRecord) -> Vec<JobRecord> {
        let Some(run_id) = run.api_id() else {
            tracing::debug!(run_id = %run.id, "Run has no API id, skipping log fetch");
            return Vec::new();
        };

        let jobs = match self.api.list_jobs(run_id).await {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::warn!(run_id, "Could not list jobs: {e}");
                crate::metrics::error_recorded(e.category());
                return Vec::new();
            }
        };

        let mut records = Vec::new();
        for job in jobs.into_iter().filter(|j| j.conclusion.is_failure()) {
            let log_text = match self.api.job_log(job.id).await {
                Ok(text) => Some(truncate_tail(&text, self.tail_bytes).to_string()),
                Err(e) => {
                    let err = FeedbackError::PartialLogFailure {
                        job: job.name.clone(),
                        reason: e.to_string(),
                    };
                    tracing::warn!(run_id, job_id = job.id, "{err}");
                    crate::metrics::log_fetch_failed();
                    None
                }
            };

            records.push(JobRecord {
                name: job.name,
                conclusion: job.conclusion,
                log_text,
            });
        }

        tracing::info!(
            run_id,
            failed_jobs = records.len(),
            fetched = records.iter().filter(|r| r.log_text.is_some()).count(),
            "Fetched job logs"
        );

        records
    }
}

/// Keep at most `max_bytes` of the end of `text`, starting on a character
/// boundary.
pub fn truncate_tail(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }

    let mut start = text.len() - max_bytes;
    while !text.is_char_boundary(start) {
        start += 1;
    }
    &text[start..]
}
