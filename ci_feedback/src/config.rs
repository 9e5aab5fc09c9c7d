//! Feedback agent configuration — loaded from environment variables.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct FeedbackConfig {
    /// Repository to poll, as `owner/name`.
    pub repository: String,
    /// GitHub personal access token for API calls.
    pub github_token: String,
    /// Base URL of the GitHub REST API.
    pub api_url: String,
    /// Branch to poll. Resolved from git when unset.
    pub branch: Option<String>,
    /// GitHub webhook secret for HMAC validation.
    pub webhook_secret: String,
    /// Feedback report written for the remediation agent.
    pub feedback_path: PathBuf,
    /// Status record written after each generation.
    pub status_path: PathBuf,
    /// Editor notification note written on push notifications.
    pub notification_path: PathBuf,
    /// Seconds between polling cycles.
    pub poll_interval_secs: u64,
    /// Seconds to wait after a failed polling cycle.
    pub backoff_interval_secs: u64,
    /// Minimum report age, in seconds, before polling regenerates it.
    pub staleness_secs: u64,
    /// Bytes of trailing log output kept per job.
    pub log_tail_bytes: usize,
    /// Timeout for each outbound API request, in seconds.
    pub http_timeout_secs: u64,
}

impl FeedbackConfig {
    pub fn from_env() -> Self {
        let repository = std::env::var("CI_REPOSITORY").unwrap_or_default();
        let github_token = std::env::var("CI_GITHUB_TOKEN").unwrap_or_default();
        let api_url = std::env::var("CI_API_URL")
            .unwrap_or_else(|_| "https://api.github.com".to_string());
        let branch = std::env::var("CI_BRANCH").ok().filter(|b| !b.is_empty());
        let webhook_secret = std::env::var("CI_WEBHOOK_SECRET").unwrap_or_default();
        let feedback_path = std::env::var("CI_FEEDBACK_PATH")
            .unwrap_or_else(|_| "AGENT_FEEDBACK.md".to_string())
            .into();
        let status_path = std::env::var("CI_STATUS_PATH")
            .unwrap_or_else(|_| ".vscode/webhook_status.json".to_string())
            .into();
        let notification_path = std::env::var("CI_NOTIFICATION_PATH")
            .unwrap_or_else(|_| ".vscode/agent_notification.md".to_string())
            .into();
        let poll_interval_secs = std::env::var("CI_POLL_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);
        let backoff_interval_secs = std::env::var("CI_BACKOFF_INTERVAL")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        let staleness_secs = std::env::var("CI_STALENESS_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(300);
        let log_tail_bytes = std::env::var("CI_LOG_TAIL_BYTES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(10 * 1024);
        let http_timeout_secs = std::env::var("CI_HTTP_TIMEOUT")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        if webhook_secret.is_empty() {
            tracing::warn!("CI_WEBHOOK_SECRET not set -- webhook signature validation disabled");
        }
        if github_token.is_empty() {
            tracing::warn!("CI_GITHUB_TOKEN not set -- GitHub API calls are unauthenticated");
        }

        Self {
            repository,
            github_token,
            api_url,
            branch,
            webhook_secret,
            feedback_path,
            status_path,
            notification_path,
            poll_interval_secs,
            backoff_interval_secs,
            staleness_secs,
            log_tail_bytes,
            http_timeout_secs,
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn backoff_interval(&self) -> Duration {
        Duration::from_secs(self.backoff_interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

impl Default for FeedbackConfig {
    fn default() -> Self {
        Self {
            repository: String::new(),
            github_token: String::new(),
            api_url: "https://api.github.com".to_string(),
            branch: None,
            webhook_secret: String::new(),
            feedback_path: "AGENT_FEEDBACK.md".into(),
            status_path: ".vscode/webhook_status.json".into(),
            notification_path: ".vscode/agent_notification.md".into(),
            poll_interval_secs: 30,
            backoff_interval_secs: 60,
            staleness_secs: 300,
            log_tail_bytes: 10 * 1024,
            http_timeout_secs: 30,
        }
    }
}
