//! Polling loop — periodically checks the latest run and generates feedback.
//!
//! Runs until the shutdown token is cancelled. Any failed cycle is logged
//! and followed by the longer backoff wait instead of the normal interval.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::error::FeedbackError;
use crate::models::run::Conclusion;
use crate::services::pipeline::{FeedbackPipeline, GenerationSummary, PollDecision, Trigger};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Idle,
    Checking,
    Generating,
}

impl fmt::Display for PollState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Checking => "checking",
            Self::Generating => "generating",
        })
    }
}

/// Wait times between cycles.
#[derive(Debug, Clone, Copy)]
pub struct PollIntervals {
    pub interval: Duration,
    pub backoff: Duration,
}

impl PollIntervals {
    /// Next wait, decided once per cycle from its result.
    pub fn next_wait<T>(&self, result: &Result<T, FeedbackError>) -> Duration {
        match result {
            Ok(_) => self.interval,
            Err(_) => self.backoff,
        }
    }
}

/// Run the polling loop until `shutdown` is cancelled.
pub async fn run_poller(
    pipeline: Arc<FeedbackPipeline>,
    branch: String,
    intervals: PollIntervals,
    shutdown: CancellationToken,
) {
    tracing::info!(
        branch = %branch,
        interval_secs = intervals.interval.as_secs(),
        backoff_secs = intervals.backoff.as_secs(),
        "CI poller started"
    );

    let mut state = PollState::Idle;
    loop {
        let result = tokio::select! {
            _ = shutdown.cancelled() => break,
            result = poll_cycle(&pipeline, &branch, &mut state) => result,
        };

        if let Err(e) = &result {
            tracing::warn!(category = e.category(), "CI check failed: {e}");
            crate::metrics::error_recorded(e.category());
        }
        transition(&mut state, PollState::Idle);

        let wait = intervals.next_wait(&result);
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }
    }

    tracing::info!("CI poller stopped");
}

async fn poll_cycle(
    pipeline: &FeedbackPipeline,
    branch: &str,
    state: &mut PollState,
) -> Result<(), FeedbackError> {
    transition(state, PollState::Checking);
    let now = Utc::now();

    match pipeline.evaluate(branch, now).await? {
        PollDecision::Generate(run) => {
            transition(state, PollState::Generating);
            tracing::info!(run_id = %run.id, "CI failure detected - generating feedback");
            let summary = pipeline.generate(&run, Trigger::Poll, now).await?;
            log_generated(&summary, pipeline);
        }
        decision => log_decision(&decision, branch),
    }

    Ok(())
}

fn transition(state: &mut PollState, next: PollState) {
    if *state != next {
        tracing::debug!(from = %state, to = %next, "Poller state");
        *state = next;
    }
}

/// One human-readable status line per cycle.
pub fn log_decision(decision: &PollDecision, branch: &str) {
    match decision {
        PollDecision::NoRuns => tracing::info!(branch, "No CI runs found"),
        PollDecision::NotFailed {
            run_id,
            conclusion: Conclusion::Success,
            ..
        } => tracing::info!(branch, run_id = %run_id, "CI passed - no action needed"),
        PollDecision::NotFailed {
            run_id,
            status,
            conclusion,
        } => tracing::info!(
            branch,
            run_id = %run_id,
            %conclusion,
            "CI not failed: {status}"
        ),
        PollDecision::StillFresh { run_id } => tracing::info!(
            branch,
            run_id = %run_id,
            "CI failure already reported - feedback is still fresh"
        ),
        PollDecision::Generate(run) => {
            tracing::info!(branch, run_id = %run.id, "CI failure pending feedback")
        }
    }
}

pub fn log_generated(summary: &GenerationSummary, pipeline: &FeedbackPipeline) {
    tracing::info!(
        run_id = %summary.run_id,
        trigger = summary.trigger.as_str(),
        errors = summary.errors,
        failed_jobs = summary.failed_jobs,
        unavailable_logs = summary.unavailable_logs,
        "Feedback generated: {}",
        pipeline.writer().report_path().display()
    );
}
