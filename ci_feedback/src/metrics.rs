//! Prometheus metrics for feedback agent observability.

use metrics::counter;

/// Initialize metrics exporter (Prometheus).
pub fn init_metrics() {
    let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
    if let Err(e) = builder.install() {
        tracing::warn!("Failed to install Prometheus exporter: {}", e);
    }
}

/// Record an inbound notification.
pub fn webhook_received(outcome: &str) {
    counter!("ci_feedback_webhooks_received_total", "outcome" => outcome.to_string()).increment(1);
}

/// Record a polled run and its conclusion.
pub fn run_checked(conclusion: &str) {
    counter!("ci_feedback_runs_checked_total", "conclusion" => conclusion.to_string()).increment(1);
}

/// Record a written feedback report.
pub fn report_generated(trigger: &str) {
    counter!("ci_feedback_reports_generated_total", "trigger" => trigger.to_string()).increment(1);
}

/// Record a job whose logs could not be fetched.
pub fn log_fetch_failed() {
    counter!("ci_feedback_log_fetch_failures_total").increment(1);
}

/// Record a pipeline error occurrence.
pub fn error_recorded(category: &str) {
    counter!("ci_feedback_errors_total", "category" => category.to_string()).increment(1);
}
