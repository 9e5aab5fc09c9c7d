//! Artifact persistence — feedback report, status record, notification note.
//!
//! Every write goes to a temporary file in the target directory and is then
//! renamed over the destination, so readers see either the old file or the
//! complete new one.

use std::fs::Permissions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use tempfile::NamedTempFile;

use crate::config::FeedbackConfig;
use crate::error::FeedbackError;
use crate::models::report::{FeedbackReport, StatusRecord};

#[derive(Debug, Clone)]
pub struct ArtifactWriter {
    report_path: PathBuf,
    status_path: PathBuf,
    notification_path: PathBuf,
    staleness: Duration,
}

impl ArtifactWriter {
    pub fn new(
        report_path: impl Into<PathBuf>,
        status_path: impl Into<PathBuf>,
        notification_path: impl Into<PathBuf>,
        staleness_secs: u64,
    ) -> Self {
        Self {
            report_path: report_path.into(),
            status_path: status_path.into(),
            notification_path: notification_path.into(),
            staleness: staleness_window(staleness_secs),
        }
    }

    pub fn from_config(config: &FeedbackConfig) -> Self {
        Self::new(
            &config.feedback_path,
            &config.status_path,
            &config.notification_path,
            config.staleness_secs,
        )
    }

    pub fn report_path(&self) -> &Path {
        &self.report_path
    }

    pub fn status_path(&self) -> &Path {
        &self.status_path
    }

    pub fn notification_path(&self) -> &Path {
        &self.notification_path
    }

    /// File name of the report, as shown to humans.
    pub fn report_name(&self) -> String {
        self.report_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.report_path.display().to_string())
    }

    /// Last modification time of the current report, if one exists.
    pub fn report_timestamp(&self) -> Option<DateTime<Utc>> {
        let modified = std::fs::metadata(&self.report_path)
            .and_then(|m| m.modified())
            .ok()?;
        Some(DateTime::<Utc>::from(modified))
    }

    /// Staleness gate for polling: regenerate only when no report exists or
    /// the existing one is older than the threshold.
    pub fn should_generate(&self, previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match previous {
            None => true,
            Some(previous) => now - previous > self.staleness,
        }
    }

    pub fn persist(&self, report: &FeedbackReport) -> Result<(), FeedbackError> {
        write_atomic(&self.report_path, report.body.as_bytes())?;
        tracing::info!(
            path = %self.report_path.display(),
            run_id = %report.run.id,
            errors = report.errors.len(),
            "Feedback report written"
        );
        Ok(())
    }

    pub fn persist_status(&self, record: &StatusRecord) -> Result<(), FeedbackError> {
        let json = serde_json::to_vec_pretty(record).map_err(|e| FeedbackError::Persistence {
            path: self.status_path.display().to_string(),
            reason: e.to_string(),
        })?;
        write_atomic(&self.status_path, &json)?;
        tracing::debug!(path = %self.status_path.display(), state = %record.state, "Status written");
        Ok(())
    }

    pub fn persist_notification(&self, note: &str) -> Result<(), FeedbackError> {
        write_atomic(&self.notification_path, note.as_bytes())?;
        tracing::debug!(path = %self.notification_path.display(), "Notification written");
        Ok(())
    }
}

/// Thresholds beyond what chrono can represent saturate instead of panicking.
fn staleness_window(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or_else(Duration::max_value)
}

/// Mode for a rewritten artifact: whatever the existing file has, else the
/// usual world-readable default.
fn target_permissions(path: &Path) -> Option<Permissions> {
    match std::fs::metadata(path) {
        Ok(meta) => Some(meta.permissions()),
        Err(_) => default_permissions(),
    }
}

#[cfg(unix)]
fn default_permissions() -> Option<Permissions> {
    use std::os::unix::fs::PermissionsExt;
    Some(Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn default_permissions() -> Option<Permissions> {
    None
}

/// Write `bytes` to a sibling temp file, then rename it over `path`.
fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), FeedbackError> {
    let persistence = |reason: String| FeedbackError::Persistence {
        path: path.display().to_string(),
        reason,
    };

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| persistence(e.to_string()))?;

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| persistence(e.to_string()))?;
    tmp.write_all(bytes).map_err(|e| persistence(e.to_string()))?;
    // Temp files are created owner-only.
    if let Some(permissions) = target_permissions(path) {
        tmp.as_file()
            .set_permissions(permissions)
            .map_err(|e| persistence(e.to_string()))?;
    }
    tmp.as_file()
        .sync_all()
        .map_err(|e| persistence(e.to_string()))?;
    tmp.persist(path).map_err(|e| persistence(e.error.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::models::run::{Conclusion, RunRecord, RunStatus};
    use crate::services::report_composer;

    fn writer_in(dir: &Path) -> ArtifactWriter {
        ArtifactWriter::new(
            dir.join("AGENT_FEEDBACK.md"),
            dir.join(".vscode/webhook_status.json"),
            dir.join(".vscode/agent_notification.md"),
            300,
        )
    }

    fn report(body_marker: &str) -> FeedbackReport {
        let run = RunRecord {
            id: body_marker.into(),
            repository: "acme/app".into(),
            workflow_name: "CI".into(),
            branch: "main".into(),
            commit_sha: "0123456789".into(),
            status: RunStatus::Completed,
            conclusion: Conclusion::Failure,
            url: "https://example.invalid/run".into(),
            created_at: Utc::now(),
        };
        report_composer::compose(&run, Vec::new(), Utc::now())
    }

    #[test]
    fn staleness_gate_boundaries() {
        let writer = writer_in(Path::new("/nonexistent"));
        let t = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();

        assert!(writer.should_generate(None, t));
        assert!(!writer.should_generate(Some(t), t + Duration::seconds(299)));
        assert!(!writer.should_generate(Some(t), t + Duration::seconds(300)));
        assert!(writer.should_generate(Some(t), t + Duration::seconds(301)));
    }

    #[test]
    fn huge_staleness_saturates() {
        let writer = ArtifactWriter::new("a", "b", "c", u64::MAX);
        let t = Utc.with_ymd_and_hms(2026, 10, 18, 9, 0, 0).unwrap();
        assert!(!writer.should_generate(Some(t), t + Duration::days(365 * 100)));

        let writer = ArtifactWriter::new("a", "b", "c", u64::MAX / 2);
        assert!(writer.should_generate(None, t));
    }

    #[cfg(unix)]
    #[test]
    fn persist_keeps_existing_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());
        std::fs::write(writer.report_path(), "old").unwrap();
        std::fs::set_permissions(writer.report_path(), Permissions::from_mode(0o640)).unwrap();

        writer.persist(&report("x")).unwrap();

        let mode = std::fs::metadata(writer.report_path())
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn new_artifacts_are_world_readable() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());
        writer.persist(&report("x")).unwrap();
        writer
            .persist_status(&StatusRecord::ready("failure_processed", Utc::now()))
            .unwrap();

        for path in [writer.report_path(), writer.status_path()] {
            let mode = std::fs::metadata(path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o644, "{}", path.display());
        }
    }

    #[test]
    fn persist_overwrites_previous_report() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());

        writer.persist(&report("first")).unwrap();
        writer.persist(&report("second")).unwrap();

        let body = std::fs::read_to_string(writer.report_path()).unwrap();
        assert!(body.contains("**Run ID**: second"));
        assert!(!body.contains("**Run ID**: first"));
    }

    #[test]
    fn persist_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());
        writer.persist(&report("only")).unwrap();

        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["AGENT_FEEDBACK.md"]);
    }

    #[test]
    fn status_record_is_json() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());
        writer
            .persist_status(&StatusRecord::ready("failure_processed", Utc::now()))
            .unwrap();

        let raw = std::fs::read_to_string(writer.status_path()).unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["state"], "failure_processed");
        assert_eq!(json["ready"], true);
        assert!(json["timestamp"].is_string());
    }

    #[test]
    fn report_timestamp_tracks_file() {
        let dir = tempfile::tempdir().unwrap();
        let writer = writer_in(dir.path());
        assert!(writer.report_timestamp().is_none());

        writer.persist(&report("x")).unwrap();
        let stamp = writer.report_timestamp().unwrap();
        assert!(Utc::now() - stamp < Duration::seconds(60));
    }

    #[test]
    fn unwritable_target_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "file, not a directory").unwrap();
        let writer = ArtifactWriter::new(
            blocker.join("AGENT_FEEDBACK.md"),
            blocker.join("status.json"),
            blocker.join("note.md"),
            300,
        );

        let err = writer.persist(&report("x")).unwrap_err();
        assert!(matches!(err, FeedbackError::Persistence { .. }));
    }
}
