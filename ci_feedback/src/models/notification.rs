//! Inbound failure notification posted by a CI workflow step.

use serde_json::{Map, Value};

use super::run::UNKNOWN;
use crate::error::FeedbackError;

/// Decoded notification. Every field falls back to [`UNKNOWN`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookNotification {
    pub repository: String,
    pub branch: String,
    pub commit: String,
    pub workflow: String,
    pub status: String,
    pub message: String,
    pub artifacts_url: String,
    /// Present only when the sender includes the run id.
    pub run_id: Option<String>,
}

impl WebhookNotification {
    /// Decode a request body. The body must be a JSON object. Scalar values
    /// of known keys are taken as text; missing, `null` or nested values are
    /// defaulted rather than rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, FeedbackError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| FeedbackError::MalformedResponse(format!("notification body: {e}")))?;
        Self::from_value(&value)
    }

    pub fn from_value(value: &Value) -> Result<Self, FeedbackError> {
        let object = value.as_object().ok_or_else(|| {
            FeedbackError::MalformedResponse("notification body is not a JSON object".into())
        })?;

        Ok(Self {
            repository: text_field(object, "repository"),
            branch: text_field(object, "branch"),
            commit: text_field(object, "commit"),
            workflow: text_field(object, "workflow"),
            status: text_field(object, "status"),
            message: text_field(object, "message"),
            artifacts_url: text_field(object, "artifacts_url"),
            run_id: scalar_text(object, "run_id"),
        })
    }
}

fn text_field(object: &Map<String, Value>, key: &str) -> String {
    scalar_text(object, key).unwrap_or_else(|| UNKNOWN.to_string())
}

fn scalar_text(object: &Map<String, Value>, key: &str) -> Option<String> {
    match object.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null => None,
        other => {
            tracing::debug!(key, "Ignoring non-scalar notification field: {other}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default_to_unknown() {
        let n = WebhookNotification::from_slice(br#"{"branch":"main"}"#).unwrap();
        assert_eq!(n.branch, "main");
        assert_eq!(n.commit, UNKNOWN);
        assert_eq!(n.repository, UNKNOWN);
        assert_eq!(n.run_id, None);
    }

    #[test]
    fn numeric_run_id_is_accepted() {
        let n = WebhookNotification::from_slice(br#"{"run_id": 991}"#).unwrap();
        assert_eq!(n.run_id.as_deref(), Some("991"));
    }

    #[test]
    fn non_object_body_is_malformed() {
        let err = WebhookNotification::from_slice(b"[1,2,3]").unwrap_err();
        assert!(matches!(err, FeedbackError::MalformedResponse(_)));
    }

    #[test]
    fn invalid_json_is_malformed() {
        let err = WebhookNotification::from_slice(b"{not json").unwrap_err();
        assert!(matches!(err, FeedbackError::MalformedResponse(_)));
    }

    #[test]
    fn scalar_fields_are_stringified() {
        let n = WebhookNotification::from_slice(br#"{"branch": 5, "commit": 12, "message": true}"#)
            .unwrap();
        assert_eq!(n.branch, "5");
        assert_eq!(n.commit, "12");
        assert_eq!(n.message, "true");
    }

    #[test]
    fn nested_fields_fall_back_to_unknown() {
        let n = WebhookNotification::from_slice(
            br#"{"commit": {"sha": "abc"}, "branch": ["main"], "run_id": [1]}"#,
        )
        .unwrap();
        assert_eq!(n.commit, UNKNOWN);
        assert_eq!(n.branch, UNKNOWN);
        assert_eq!(n.run_id, None);
    }
}
