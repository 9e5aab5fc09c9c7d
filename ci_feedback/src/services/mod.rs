//! Feedback agent services — fetching, extraction, composition, persistence.

pub mod artifact_writer;
pub mod error_extractor;
pub mod git_service;
pub mod github_service;
pub mod log_fetcher;
pub mod pipeline;
pub mod poller;
pub mod report_composer;
pub mod source_provider;
