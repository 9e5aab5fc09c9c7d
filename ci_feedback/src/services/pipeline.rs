//! Feedback pipeline — source → logs → extraction → report → artifacts.
//!
//! Shared by the polling loop and the notification listener. Each stage
//! returns a `Result`; callers decide what to do with failures.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::error::FeedbackError;
use crate::models::notification::WebhookNotification;
use crate::models::report::StatusRecord;
use crate::models::run::{Conclusion, RunRecord, RunStatus};
use crate::services::artifact_writer::ArtifactWriter;
use crate::services::error_extractor;
use crate::services::github_service::CiApi;
use crate::services::log_fetcher::LogFetcher;
use crate::services::report_composer;
use crate::services::source_provider::{PollSource, PushSource, SourceProvider};

/// What started a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Poll,
    Push,
}

impl Trigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Poll => "poll",
            Self::Push => "push",
        }
    }

    /// Marker written to the status record.
    pub fn state(&self) -> &'static str {
        match self {
            Self::Poll => "failure_processed",
            Self::Push => "notification_processed",
        }
    }
}

/// Result of inspecting the latest run, before any generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollDecision {
    /// The branch has no runs yet.
    NoRuns,
    /// The latest run did not fail.
    NotFailed {
        run_id: String,
        status: RunStatus,
        conclusion: Conclusion,
    },
    /// The failure was already reported recently.
    StillFresh { run_id: String },
    /// A report should be generated for this run.
    Generate(RunRecord),
}

/// Summary of one written report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    pub run_id: String,
    pub trigger: Trigger,
    pub errors: usize,
    pub failed_jobs: usize,
    pub unavailable_logs: usize,
}

/// Outcome of a full single-check pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Skipped(PollDecision),
    Generated(GenerationSummary),
}

pub struct FeedbackPipeline {
    source: Arc<dyn SourceProvider>,
    logs: LogFetcher,
    writer: Arc<ArtifactWriter>,
}

impl FeedbackPipeline {
    pub fn new(api: Arc<dyn CiApi>, writer: Arc<ArtifactWriter>, log_tail_bytes: usize) -> Self {
        Self {
            source: Arc::new(PollSource::new(api.clone())),
            logs: LogFetcher::new(api, log_tail_bytes),
            writer,
        }
    }

    pub fn writer(&self) -> &ArtifactWriter {
        &self.writer
    }

    /// Look at the latest run on `branch` and decide whether to generate.
    pub async fn evaluate(
        &self,
        branch: &str,
        now: DateTime<Utc>,
    ) -> Result<PollDecision, FeedbackError> {
        let Some(run) = self.source.latest_run(branch).await? else {
            return Ok(PollDecision::NoRuns);
        };
        crate::metrics::run_checked(run.conclusion.as_str());

        if !run.conclusion.is_failure() {
            return Ok(PollDecision::NotFailed {
                run_id: run.id,
                status: run.status,
                conclusion: run.conclusion,
            });
        }

        if !self
            .writer
            .should_generate(self.writer.report_timestamp(), now)
        {
            return Ok(PollDecision::StillFresh { run_id: run.id });
        }

        Ok(PollDecision::Generate(run))
    }

    /// One poll-mode pass: evaluate, then generate if needed.
    pub async fn check_once(&self, branch: &str) -> Result<CycleOutcome, FeedbackError> {
        let now = Utc::now();
        match self.evaluate(branch, now).await? {
            PollDecision::Generate(run) => self
                .generate(&run, Trigger::Poll, now)
                .await
                .map(CycleOutcome::Generated),
            decision => Ok(CycleOutcome::Skipped(decision)),
        }
    }

    /// Push-mode pass. Always generates; the staleness gate does not apply.
    pub async fn handle_notification(
        &self,
        notification: &WebhookNotification,
    ) -> Result<GenerationSummary, FeedbackError> {
        let now = Utc::now();
        let source = PushSource::accept(notification, now);
        tracing::info!(
            repository = %notification.repository,
            branch = %notification.branch,
            message = %notification.message,
            "Notification received"
        );

        let run = source
            .latest_run(&notification.branch)
            .await?
            .ok_or_else(|| {
                FeedbackError::MalformedResponse("notification yielded no run".into())
            })?;
        let summary = self.generate(&run, Trigger::Push, now).await?;

        let note = report_composer::render_notification(
            &notification.message,
            &self.writer.report_name(),
            now,
        );
        self.writer.persist_notification(&note)?;

        Ok(summary)
    }

    /// Fetch logs, extract errors, compose and persist the report and status.
    pub async fn generate(
        &self,
        run: &RunRecord,
        trigger: Trigger,
        now: DateTime<Utc>,
    ) -> Result<GenerationSummary, FeedbackError> {
        let jobs = self.logs.fetch_logs(run).await;

        let entries: Vec<_> = jobs
            .iter()
            .filter_map(|job| {
                job.log_text
                    .as_deref()
                    .map(|log| error_extractor::extract(&job.name, log))
            })
            .flatten()
            .collect();

        let report = report_composer::compose(run, entries, now);
        self.writer.persist(&report)?;
        self.writer
            .persist_status(&StatusRecord::ready(trigger.state(), now))?;

        crate::metrics::report_generated(trigger.as_str());

        Ok(GenerationSummary {
            run_id: run.id.clone(),
            trigger,
            errors: report.errors.len(),
            failed_jobs: jobs.len(),
            unavailable_logs: jobs.iter().filter(|j| j.log_text.is_none()).count(),
        })
    }
}
