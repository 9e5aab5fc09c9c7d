//! Centrix CI Feedback — turns failed CI runs into agent-readable reports.
//!
//! A failure is learned either by polling the GitHub Actions API or from a
//! notification POSTed by the workflow itself. Failed job logs are fetched,
//! `Error:` lines extracted, and a markdown report plus a JSON status record
//! are written atomically for a remediation agent to pick up.

pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod routes;
pub mod services;
