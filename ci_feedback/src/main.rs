//! Centrix CI Feedback — CLI entry point.
//!
//! `check` runs one polling pass, `watch` polls until stopped, `serve`
//! listens for failure notifications, and `run` does both in one process
//! against the same artifact files.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;

use ci_feedback::config::FeedbackConfig;
use ci_feedback::routes::{self, ListenerState};
use ci_feedback::services::artifact_writer::ArtifactWriter;
use ci_feedback::services::git_service;
use ci_feedback::services::github_service::GitHubClient;
use ci_feedback::services::pipeline::{CycleOutcome, FeedbackPipeline};
use ci_feedback::services::poller::{self, PollIntervals};

#[derive(Parser)]
#[command(name = "ci-feedback", about = "CI failure feedback for remediation agents")]
struct Cli {
    /// Repository to poll (owner/name)
    #[arg(long, env = "CI_REPOSITORY", global = true)]
    repository: Option<String>,

    /// Branch to poll (defaults to the current git branch)
    #[arg(long, env = "CI_BRANCH", global = true)]
    branch: Option<String>,

    /// Feedback report path
    #[arg(long, env = "CI_FEEDBACK_PATH", global = true)]
    feedback_path: Option<std::path::PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Check the latest run once and generate feedback if it failed
    Check,
    /// Poll continuously until stopped
    Watch,
    /// Listen for failure notifications
    Serve(ServeArgs),
    /// Poll and listen in one process
    Run(ServeArgs),
}

#[derive(clap::Args)]
struct ServeArgs {
    /// Listener port
    #[arg(short, long, env = "CI_PORT", default_value = "8080")]
    port: u16,

    /// Listener bind address
    #[arg(long, env = "CI_BIND", default_value = "127.0.0.1")]
    bind: IpAddr,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }

    let cli = Cli::parse();

    let mut config = FeedbackConfig::from_env();
    if let Some(repository) = cli.repository {
        config.repository = repository;
    }
    if let Some(branch) = cli.branch {
        config.branch = Some(branch);
    }
    if let Some(feedback_path) = cli.feedback_path {
        config.feedback_path = feedback_path;
    }

    let client = GitHubClient::new(&config)
        .map_err(|e| anyhow::anyhow!("failed to build GitHub client: {e}"))?;
    let writer = Arc::new(ArtifactWriter::from_config(&config));
    let pipeline = Arc::new(FeedbackPipeline::new(
        Arc::new(client),
        writer,
        config.log_tail_bytes,
    ));

    match cli.command {
        Command::Check => check(&pipeline, &config).await,
        Command::Watch => {
            ci_feedback::metrics::init_metrics();
            let shutdown = CancellationToken::new();
            tokio::spawn(shutdown_signal(shutdown.clone()));
            watch(pipeline, &config, shutdown).await
        }
        Command::Serve(args) => {
            ci_feedback::metrics::init_metrics();
            let shutdown = CancellationToken::new();
            tokio::spawn(shutdown_signal(shutdown.clone()));
            serve(pipeline, &config, &args, shutdown).await
        }
        Command::Run(args) => {
            ci_feedback::metrics::init_metrics();
            let shutdown = CancellationToken::new();
            tokio::spawn(shutdown_signal(shutdown.clone()));

            // Either side failing to start stops the other.
            let polling = async {
                let result = watch(pipeline.clone(), &config, shutdown.clone()).await;
                if result.is_err() {
                    shutdown.cancel();
                }
                result
            };
            let serving = async {
                let result = serve(pipeline.clone(), &config, &args, shutdown.clone()).await;
                if result.is_err() {
                    shutdown.cancel();
                }
                result
            };
            let (polled, served) = tokio::join!(polling, serving);
            polled.and(served)
        }
    }
}

async fn resolve_branch(config: &FeedbackConfig) -> anyhow::Result<String> {
    match &config.branch {
        Some(branch) => Ok(branch.clone()),
        None => git_service::current_branch().await,
    }
}

fn require_repository(config: &FeedbackConfig) -> anyhow::Result<()> {
    if config.repository.is_empty() {
        anyhow::bail!("no repository configured; pass --repository or set CI_REPOSITORY");
    }
    Ok(())
}

async fn check(pipeline: &FeedbackPipeline, config: &FeedbackConfig) -> anyhow::Result<()> {
    require_repository(config)?;
    let branch = resolve_branch(config).await?;
    tracing::info!(repository = %config.repository, branch = %branch, "Checking CI status");

    match pipeline.check_once(&branch).await {
        Ok(CycleOutcome::Generated(summary)) => poller::log_generated(&summary, pipeline),
        Ok(CycleOutcome::Skipped(decision)) => poller::log_decision(&decision, &branch),
        Err(e) => {
            tracing::warn!(category = e.category(), "CI check failed: {e}");
            return Err(e.into());
        }
    }

    Ok(())
}

async fn watch(
    pipeline: Arc<FeedbackPipeline>,
    config: &FeedbackConfig,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    require_repository(config)?;
    let branch = resolve_branch(config).await?;
    let intervals = PollIntervals {
        interval: config.poll_interval(),
        backoff: config.backoff_interval(),
    };

    poller::run_poller(pipeline, branch, intervals, shutdown).await;
    Ok(())
}

async fn serve(
    pipeline: Arc<FeedbackPipeline>,
    config: &FeedbackConfig,
    args: &ServeArgs,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let state = ListenerState::new(pipeline, config.webhook_secret.clone());
    let app = routes::feedback_router(state);

    let addr = SocketAddr::new(args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("CI feedback listener on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("Listener stopped");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received SIGINT, shutting down..."),
        _ = terminate => tracing::info!("Received SIGTERM, shutting down..."),
    }

    shutdown.cancel();
}
