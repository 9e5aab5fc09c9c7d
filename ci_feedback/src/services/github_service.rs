//! GitHub integration — webhook validation and Actions REST queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::header;
use serde::Deserialize;
use sha2::Sha256;

use crate::config::FeedbackConfig;
use crate::error::FeedbackError;
use crate::models::run::{Conclusion, JobSummary, RunRecord, RunStatus, UNKNOWN};

type HmacSha256 = Hmac<Sha256>;

/// Outbound queries the pipeline needs from a CI provider.
#[async_trait]
pub trait CiApi: Send + Sync {
    /// Most recent runs for a branch, newest first as far as the provider knows.
    async fn list_runs(&self, branch: &str) -> Result<Vec<RunRecord>, FeedbackError>;

    /// Jobs belonging to a run.
    async fn list_jobs(&self, run_id: u64) -> Result<Vec<JobSummary>, FeedbackError>;

    /// Raw log output of one job.
    async fn job_log(&self, job_id: u64) -> Result<String, FeedbackError>;
}

/// Validate a GitHub webhook signature (X-Hub-Signature-256).
pub fn validate_signature(secret: &str, payload: &[u8], signature: &str) -> bool {
    if secret.is_empty() {
        tracing::debug!("Webhook secret not configured, skipping validation");
        return true;
    }

    let sig = signature.strip_prefix("sha256=").unwrap_or(signature);
    let sig_bytes = match hex::decode(sig) {
        Ok(b) => b,
        Err(_) => return false,
    };

    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => return false,
    };
    mac.update(payload);

    mac.verify_slice(&sig_bytes).is_ok()
}

/// GitHub Actions REST client scoped to one repository.
#[derive(Clone, Debug)]
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    repository: String,
    token: String,
}

impl GitHubClient {
    pub fn new(config: &FeedbackConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .user_agent("centrix-ci-feedback")
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            repository: config.repository.clone(),
            token: config.github_token.clone(),
        })
    }

    fn get(&self, url: &str, accept: &str) -> reqwest::RequestBuilder {
        let request = self
            .client
            .get(url)
            .header(header::ACCEPT, accept)
            .header("X-GitHub-Api-Version", "2022-11-28");

        if self.token.is_empty() {
            request
        } else {
            request.bearer_auth(&self.token)
        }
    }

    async fn get_text(
        &self,
        url: &str,
        accept: &str,
        query: &[(&str, &str)],
    ) -> Result<String, FeedbackError> {
        let resp = self.get(url, accept).query(query).send().await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(FeedbackError::TransientFetch(format!(
                "GET {url} returned {status}: {}",
                text.chars().take(200).collect::<String>()
            )));
        }

        Ok(resp.text().await?)
    }
}

#[async_trait]
impl CiApi for GitHubClient {
    async fn list_runs(&self, branch: &str) -> Result<Vec<RunRecord>, FeedbackError> {
        let url = format!("{}/repos/{}/actions/runs", self.api_url, self.repository);
        tracing::debug!(%url, branch, "Fetching workflow runs");

        let body = self
            .get_text(
                &url,
                "application/vnd.github+json",
                &[("branch", branch), ("per_page", "5")],
            )
            .await?;
        parse_runs(&body, &self.repository)
    }

    async fn list_jobs(&self, run_id: u64) -> Result<Vec<JobSummary>, FeedbackError> {
        let url = format!(
            "{}/repos/{}/actions/runs/{run_id}/jobs",
            self.api_url, self.repository
        );
        tracing::debug!(%url, "Fetching jobs");

        let body = self
            .get_text(&url, "application/vnd.github+json", &[("per_page", "100")])
            .await?;
        parse_jobs(&body)
    }

    async fn job_log(&self, job_id: u64) -> Result<String, FeedbackError> {
        let url = format!(
            "{}/repos/{}/actions/jobs/{job_id}/logs",
            self.api_url, self.repository
        );

        // The endpoint redirects to blob storage; reqwest follows it and
        // drops the Authorization header on the cross-origin hop.
        self.get_text(&url, "application/vnd.github.v3.raw", &[]).await
    }
}

// ── Response parsing ──

#[derive(Debug, Deserialize)]
struct RunsResponse {
    #[serde(default)]
    workflow_runs: Vec<ApiRun>,
}

#[derive(Debug, Deserialize)]
struct ApiRun {
    id: u64,
    name: Option<String>,
    head_branch: Option<String>,
    head_sha: Option<String>,
    status: Option<String>,
    conclusion: Option<String>,
    html_url: Option<String>,
    created_at: DateTime<Utc>,
    repository: Option<ApiRepository>,
}

#[derive(Debug, Deserialize)]
struct ApiRepository {
    full_name: String,
}

#[derive(Debug, Deserialize)]
struct JobsResponse {
    #[serde(default)]
    jobs: Vec<ApiJob>,
}

#[derive(Debug, Deserialize)]
struct ApiJob {
    id: u64,
    name: Option<String>,
    conclusion: Option<String>,
}

/// Decode a `GET /actions/runs` body into run records.
pub fn parse_runs(body: &str, repository: &str) -> Result<Vec<RunRecord>, FeedbackError> {
    let parsed: RunsResponse = serde_json::from_str(body)
        .map_err(|e| FeedbackError::MalformedResponse(format!("workflow runs: {e}")))?;

    Ok(parsed
        .workflow_runs
        .into_iter()
        .map(|run| RunRecord {
            id: run.id.to_string(),
            repository: run
                .repository
                .map(|r| r.full_name)
                .unwrap_or_else(|| repository.to_string()),
            workflow_name: run.name.unwrap_or_else(|| UNKNOWN.to_string()),
            branch: run.head_branch.unwrap_or_else(|| UNKNOWN.to_string()),
            commit_sha: run.head_sha.unwrap_or_else(|| UNKNOWN.to_string()),
            status: RunStatus::from_api(run.status.as_deref()),
            conclusion: Conclusion::from_api(run.conclusion.as_deref()),
            url: run.html_url.unwrap_or_else(|| UNKNOWN.to_string()),
            created_at: run.created_at,
        })
        .collect())
}

/// Decode a `GET /actions/runs/{id}/jobs` body.
pub fn parse_jobs(body: &str) -> Result<Vec<JobSummary>, FeedbackError> {
    let parsed: JobsResponse = serde_json::from_str(body)
        .map_err(|e| FeedbackError::MalformedResponse(format!("jobs: {e}")))?;

    Ok(parsed
        .jobs
        .into_iter()
        .map(|job| JobSummary {
            id: job.id,
            name: job.name.unwrap_or_else(|| UNKNOWN.to_string()),
            conclusion: Conclusion::from_api(job.conclusion.as_deref()),
        })
        .collect())
}
