//! Failure taxonomy shared by every pipeline stage.

/// Errors surfaced by the feedback pipeline.
///
/// None of these are fatal to a long-running process: the poller backs off
/// and retries, the listener answers with a server-fault status.
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    /// Network or API failure; the caller retries after backoff.
    #[error("transient fetch error: {0}")]
    TransientFetch(String),

    /// A remote response or inbound payload had an unexpected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Logs for a single job could not be fetched.
    #[error("logs unavailable for job {job}: {reason}")]
    PartialLogFailure { job: String, reason: String },

    /// An artifact could not be written.
    #[error("failed to persist {path}: {reason}")]
    Persistence { path: String, reason: String },

    /// Inbound notification failed HMAC validation.
    #[error("webhook signature validation failed")]
    Signature,
}

impl FeedbackError {
    /// Short label used for metrics and log fields.
    pub fn category(&self) -> &'static str {
        match self {
            Self::TransientFetch(_) => "transient_fetch",
            Self::MalformedResponse(_) => "malformed_response",
            Self::PartialLogFailure { .. } => "partial_log_failure",
            Self::Persistence { .. } => "persistence",
            Self::Signature => "signature",
        }
    }
}

impl From<reqwest::Error> for FeedbackError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::TransientFetch(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn categories_are_stable_labels() {
        assert_eq!(
            FeedbackError::TransientFetch("timeout".into()).category(),
            "transient_fetch"
        );
        assert_eq!(
            FeedbackError::Persistence {
                path: "AGENT_FEEDBACK.md".into(),
                reason: "read-only".into(),
            }
            .category(),
            "persistence"
        );
    }

    #[test]
    fn partial_log_failure_names_the_job() {
        let err = FeedbackError::PartialLogFailure {
            job: "unit".into(),
            reason: "404".into(),
        };
        assert_eq!(err.to_string(), "logs unavailable for job unit: 404");
    }
}
