#![allow(dead_code)]

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};

use ci_feedback::error::FeedbackError;
use ci_feedback::models::run::{Conclusion, JobSummary, RunRecord, RunStatus};
use ci_feedback::services::artifact_writer::ArtifactWriter;
use ci_feedback::services::github_service::CiApi;
use ci_feedback::services::log_fetcher::DEFAULT_LOG_TAIL_BYTES;
use ci_feedback::services::pipeline::FeedbackPipeline;

/// In-memory CI API.
#[derive(Default)]
pub struct FakeApi {
    runs: Vec<RunRecord>,
    runs_error: Option<String>,
    failures_left: AtomicUsize,
    run_checks: AtomicUsize,
    jobs: Vec<JobSummary>,
    jobs_error: Option<String>,
    logs: HashMap<u64, Result<String, String>>,
}

impl FakeApi {
    pub fn with_run(run: RunRecord) -> Self {
        Self {
            runs: vec![run],
            ..Self::default()
        }
    }

    pub fn failing_runs(reason: &str) -> Self {
        Self::default().fail_runs(reason, usize::MAX)
    }

    /// Fail the next `times` run listings, then serve the configured runs.
    pub fn fail_runs(mut self, reason: &str, times: usize) -> Self {
        self.runs_error = Some(reason.to_string());
        self.failures_left = AtomicUsize::new(times);
        self
    }

    pub fn failing_jobs(mut self, reason: &str) -> Self {
        self.jobs_error = Some(reason.to_string());
        self
    }

    /// Number of run listings requested so far.
    pub fn run_checks(&self) -> usize {
        self.run_checks.load(Ordering::SeqCst)
    }

    pub fn job(mut self, id: u64, name: &str, conclusion: Conclusion, log: &str) -> Self {
        self.jobs.push(JobSummary {
            id,
            name: name.to_string(),
            conclusion,
        });
        self.logs.insert(id, Ok(log.to_string()));
        self
    }

    pub fn job_without_log(mut self, id: u64, name: &str, reason: &str) -> Self {
        self.jobs.push(JobSummary {
            id,
            name: name.to_string(),
            conclusion: Conclusion::Failure,
        });
        self.logs.insert(id, Err(reason.to_string()));
        self
    }
}

#[async_trait]
impl CiApi for FakeApi {
    async fn list_runs(&self, _branch: &str) -> Result<Vec<RunRecord>, FeedbackError> {
        self.run_checks.fetch_add(1, Ordering::SeqCst);
        if let Some(reason) = &self.runs_error {
            let failed = self
                .failures_left
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if failed {
                return Err(FeedbackError::TransientFetch(reason.clone()));
            }
        }
        Ok(self.runs.clone())
    }

    async fn list_jobs(&self, _run_id: u64) -> Result<Vec<JobSummary>, FeedbackError> {
        match &self.jobs_error {
            Some(reason) => Err(FeedbackError::TransientFetch(reason.clone())),
            None => Ok(self.jobs.clone()),
        }
    }

    async fn job_log(&self, job_id: u64) -> Result<String, FeedbackError> {
        match self.logs.get(&job_id) {
            Some(Ok(log)) => Ok(log.clone()),
            Some(Err(reason)) => Err(FeedbackError::TransientFetch(reason.clone())),
            None => Err(FeedbackError::TransientFetch(format!("no log for {job_id}"))),
        }
    }
}

pub fn run(id: &str, conclusion: Conclusion) -> RunRecord {
    RunRecord {
        id: id.to_string(),
        repository: "acme/app".to_string(),
        workflow_name: "CI".to_string(),
        branch: "main".to_string(),
        commit_sha: "acb5820ced9479c074f688cc328bf03f341a511d".to_string(),
        status: RunStatus::Completed,
        conclusion,
        url: format!("https://github.com/acme/app/actions/runs/{id}"),
        created_at: Utc.with_ymd_and_hms(2026, 10, 18, 8, 15, 0).unwrap(),
    }
}

pub fn writer_in(dir: &Path) -> Arc<ArtifactWriter> {
    Arc::new(ArtifactWriter::new(
        dir.join("AGENT_FEEDBACK.md"),
        dir.join(".vscode/webhook_status.json"),
        dir.join(".vscode/agent_notification.md"),
        300,
    ))
}

pub fn pipeline(api: FakeApi, dir: &Path) -> Arc<FeedbackPipeline> {
    shared_pipeline(Arc::new(api), dir)
}

/// Pipeline over an API the test keeps a handle to.
pub fn shared_pipeline(api: Arc<FakeApi>, dir: &Path) -> Arc<FeedbackPipeline> {
    Arc::new(FeedbackPipeline::new(api, writer_in(dir), DEFAULT_LOG_TAIL_BYTES))
}

pub fn read(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap()
}
