//! Feedback agent data models — runs, jobs, reports, notifications.

pub mod notification;
pub mod report;
pub mod run;
