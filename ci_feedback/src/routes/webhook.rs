//! Notification listener — receives CI failure notifications, serves the
//! health probe.
//!
//! [`handle`] only needs a method, headers and a body, so it can sit behind
//! any HTTP server; the axum router in the parent module is one adapter.

use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::FeedbackError;
use crate::models::notification::WebhookNotification;
use crate::routes::ListenerState;
use crate::services::github_service;

const HEALTH_PAGE: &str = "<html><body>\
<h2>CI Feedback Listener Running</h2>\
<p>Ready to receive CI failure notifications.</p>\
</body></html>\n";

const SUCCESS_BODY: &str = r#"{"status":"success","message":"Agent feedback generated"}"#;

/// Status, content type and body of a listener reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerResponse {
    pub status: StatusCode,
    pub content_type: Option<&'static str>,
    pub body: Vec<u8>,
}

impl ListenerResponse {
    fn empty(status: StatusCode) -> Self {
        Self {
            status,
            content_type: None,
            body: Vec::new(),
        }
    }

    fn success() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: Some("application/json"),
            body: SUCCESS_BODY.as_bytes().to_vec(),
        }
    }

    fn health() -> Self {
        Self {
            status: StatusCode::OK,
            content_type: Some("text/html; charset=utf-8"),
            body: HEALTH_PAGE.as_bytes().to_vec(),
        }
    }
}

impl IntoResponse for ListenerResponse {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.body).into_response();
        if let Some(content_type) = self.content_type {
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
        }
        response
    }
}

/// Handle one inbound request.
pub async fn handle(
    state: &ListenerState,
    method: &Method,
    headers: &HeaderMap,
    body: &[u8],
) -> ListenerResponse {
    match method {
        &Method::GET | &Method::HEAD => ListenerResponse::health(),
        &Method::POST => match handle_notification(state, headers, body).await {
            Ok(()) => {
                crate::metrics::webhook_received("processed");
                ListenerResponse::success()
            }
            Err(FeedbackError::Signature) => {
                tracing::warn!("Webhook signature validation failed");
                crate::metrics::webhook_received("rejected");
                ListenerResponse::empty(StatusCode::UNAUTHORIZED)
            }
            Err(e) => {
                tracing::error!(category = e.category(), "Webhook processing failed: {e}");
                crate::metrics::webhook_received("failed");
                crate::metrics::error_recorded(e.category());
                ListenerResponse::empty(StatusCode::INTERNAL_SERVER_ERROR)
            }
        },
        _ => ListenerResponse::empty(StatusCode::METHOD_NOT_ALLOWED),
    }
}

async fn handle_notification(
    state: &ListenerState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), FeedbackError> {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if !github_service::validate_signature(&state.webhook_secret, body, signature) {
        return Err(FeedbackError::Signature);
    }

    let notification = WebhookNotification::from_slice(body)?;

    // One notification at a time.
    let _guard = state.gate.lock().await;
    let summary = state.pipeline.handle_notification(&notification).await?;

    tracing::info!(
        run_id = %summary.run_id,
        errors = summary.errors,
        failed_jobs = summary.failed_jobs,
        "Agent feedback generated from notification"
    );
    Ok(())
}
