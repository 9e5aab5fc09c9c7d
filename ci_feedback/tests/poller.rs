mod support;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use ci_feedback::models::run::Conclusion;
use ci_feedback::services::poller::{run_poller, PollIntervals};

use support::{pipeline, read, run, shared_pipeline, FakeApi};

fn long_intervals() -> PollIntervals {
    PollIntervals {
        interval: Duration::from_secs(3600),
        backoff: Duration::from_secs(3600),
    }
}

fn quick_intervals() -> PollIntervals {
    PollIntervals {
        interval: Duration::from_millis(10),
        backoff: Duration::from_millis(20),
    }
}

fn failed_run_api() -> FakeApi {
    FakeApi::with_run(run("42", Conclusion::Failure)).job(
        1,
        "unit",
        Conclusion::Failure,
        "Error: assertion failed\n",
    )
}

#[tokio::test]
async fn poller_generates_then_stops_on_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(failed_run_api(), dir.path());
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn(run_poller(
        pipeline.clone(),
        "main".to_string(),
        long_intervals(),
        shutdown.clone(),
    ));

    let report_path = pipeline.writer().report_path().to_path_buf();
    tokio::time::timeout(Duration::from_secs(5), async {
        while !pipeline.writer().status_path().exists() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("first cycle should write feedback");
    assert!(read(&report_path).contains("unit — Error: assertion failed"));

    // The loop is now in its hour-long wait.
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("poller should stop promptly")
        .unwrap();
}

#[tokio::test]
async fn poller_stops_during_backoff() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(FakeApi::failing_runs("connection reset"), dir.path());
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn(run_poller(
        pipeline.clone(),
        "main".to_string(),
        long_intervals(),
        shutdown.clone(),
    ));

    tokio::time::sleep(Duration::from_millis(50)).await;
    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("poller should stop promptly")
        .unwrap();

    assert!(!pipeline.writer().report_path().exists());
}

#[tokio::test]
async fn already_cancelled_token_returns_immediately() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(FakeApi::default(), dir.path());
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    tokio::time::timeout(
        Duration::from_secs(1),
        run_poller(pipeline, "main".to_string(), long_intervals(), shutdown),
    )
    .await
    .expect("poller should return at once");
}

#[tokio::test]
async fn poller_recovers_after_transient_error() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(failed_run_api().fail_runs("connection reset", 1));
    let pipeline = shared_pipeline(api.clone(), dir.path());
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn(run_poller(
        pipeline.clone(),
        "main".to_string(),
        quick_intervals(),
        shutdown.clone(),
    ));

    tokio::time::timeout(Duration::from_secs(5), async {
        while !pipeline.writer().status_path().exists() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("a cycle after the backoff should write feedback");
    assert!(api.run_checks() >= 2);
    assert!(read(pipeline.writer().report_path()).contains("unit — Error: assertion failed"));

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("poller should stop promptly")
        .unwrap();
}

#[tokio::test]
async fn poller_keeps_running_when_artifacts_cannot_be_written() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "file, not a directory").unwrap();

    let api = Arc::new(failed_run_api());
    let pipeline = shared_pipeline(api.clone(), &blocker);
    let shutdown = CancellationToken::new();

    let handle = tokio::spawn(run_poller(
        pipeline,
        "main".to_string(),
        quick_intervals(),
        shutdown.clone(),
    ));

    tokio::time::timeout(Duration::from_secs(5), async {
        while api.run_checks() < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("poller should keep cycling after write failures");
    assert!(!handle.is_finished());

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(1), handle)
        .await
        .expect("poller should stop promptly")
        .unwrap();
}
