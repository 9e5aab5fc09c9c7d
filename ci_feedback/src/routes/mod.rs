//! Listener HTTP routes — notification endpoint and health probe.

pub mod webhook;

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, Method};
use axum::Router;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

use crate::services::pipeline::FeedbackPipeline;

/// Shared state for listener handlers.
#[derive(Clone)]
pub struct ListenerState {
    pub pipeline: Arc<FeedbackPipeline>,
    pub webhook_secret: String,
    /// Serializes pipeline runs so notifications are handled one at a time.
    pub gate: Arc<Mutex<()>>,
}

impl ListenerState {
    pub fn new(pipeline: Arc<FeedbackPipeline>, webhook_secret: impl Into<String>) -> Self {
        Self {
            pipeline,
            webhook_secret: webhook_secret.into(),
            gate: Arc::new(Mutex::new(())),
        }
    }
}

/// Build the listener router. Every path is accepted: `POST` delivers a
/// notification, `GET` is the health probe.
pub fn feedback_router(state: ListenerState) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn dispatch(
    State(state): State<ListenerState>,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> webhook::ListenerResponse {
    webhook::handle(&state, &method, &headers, &body).await
}
