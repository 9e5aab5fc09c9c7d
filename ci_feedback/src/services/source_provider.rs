//! Run sources — poll the CI API or accept a pushed notification.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::FeedbackError;
use crate::models::notification::WebhookNotification;
use crate::models::run::{Conclusion, RunRecord, RunStatus, UNKNOWN};
use crate::services::github_service::CiApi;

/// Yields the latest run for a branch.
#[async_trait]
pub trait SourceProvider: Send + Sync {
    async fn latest_run(&self, branch: &str) -> Result<Option<RunRecord>, FeedbackError>;
}

/// Poll strategy: asks the CI API for recent runs on the branch.
#[derive(Clone)]
pub struct PollSource {
    api: Arc<dyn CiApi>,
}

impl PollSource {
    pub fn new(api: Arc<dyn CiApi>) -> Self {
        Self { api }
    }
}

#[async_trait]
impl SourceProvider for PollSource {
    async fn latest_run(&self, branch: &str) -> Result<Option<RunRecord>, FeedbackError> {
        let runs = self.api.list_runs(branch).await?;
        Ok(runs.into_iter().max_by_key(|run| run.created_at))
    }
}

/// Push strategy: the run was delivered by an inbound notification. The
/// branch argument is ignored; the notification names its own.
#[derive(Debug, Clone)]
pub struct PushSource {
    run: RunRecord,
}

impl PushSource {
    /// Build a run record from a notification received at `received_at`.
    /// The notification carries no creation time, so the receipt time
    /// stands in for it.
    pub fn accept(notification: &WebhookNotification, received_at: DateTime<Utc>) -> Self {
        let run = RunRecord {
            id: notification
                .run_id
                .clone()
                .unwrap_or_else(|| UNKNOWN.to_string()),
            repository: notification.repository.clone(),
            workflow_name: notification.workflow.clone(),
            branch: notification.branch.clone(),
            commit_sha: notification.commit.clone(),
            status: RunStatus::Completed,
            conclusion: Conclusion::from_api(Some(&notification.status)),
            url: notification.artifacts_url.clone(),
            created_at: received_at,
        };

        Self { run }
    }
}

#[async_trait]
impl SourceProvider for PushSource {
    async fn latest_run(&self, _branch: &str) -> Result<Option<RunRecord>, FeedbackError> {
        Ok(Some(self.run.clone()))
    }
}
