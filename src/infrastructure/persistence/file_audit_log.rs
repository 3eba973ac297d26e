//! Append-only file sink for audit entries.
//!
//! One NDJSON file per day (`audit-YYYY-MM-DD.log`) under a configurable
//! directory. This sink is the fallback when no database is configured or an
//! insert fails, so it depends on nothing but a writable directory.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::warn;

use crate::domain::audit::AuditEntry;
use crate::error::AppError;

static LOG_FILE_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^audit-(\d{4}-\d{2}-\d{2})\.log$").unwrap());

/// Writes audit entries to per-day NDJSON files.
pub struct FileAuditLog {
    dir: PathBuf,
}

impl FileAuditLog {
    /// Creates a sink rooted at `dir`. The directory is created lazily on the
    /// first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the per-day files live in.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, timestamp: &DateTime<Utc>) -> PathBuf {
        self.dir
            .join(format!("audit-{}.log", timestamp.format("%Y-%m-%d")))
    }

    /// Appends one entry as a single NDJSON line to its day's file.
    pub async fn append(&self, entry: &AuditEntry) -> Result<(), AppError> {
        self.append_batch(std::slice::from_ref(entry)).await
    }

    /// Appends a batch of entries with one write per target file.
    ///
    /// A flushed buffer is chronological, so the target file changes at most
    /// once per batch (around midnight).
    pub async fn append_batch(&self, entries: &[AuditEntry]) -> Result<(), AppError> {
        if entries.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| io_error("create audit log directory", &self.dir, e))?;

        let mut groups: Vec<(PathBuf, String)> = Vec::new();

        for entry in entries {
            let path = self.file_for(&entry.timestamp);

            let mut line = serde_json::to_string(entry).map_err(|e| {
                AppError::internal(
                    "Failed to serialize audit entry",
                    json!({ "source": e.to_string() }),
                )
            })?;
            line.push('\n');

            match groups.last_mut() {
                Some((current, buf)) if *current == path => buf.push_str(&line),
                _ => groups.push((path, line)),
            }
        }

        for (path, buf) in groups {
            let mut file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .await
                .map_err(|e| io_error("open audit log file", &path, e))?;

            file.write_all(buf.as_bytes())
                .await
                .map_err(|e| io_error("write audit log file", &path, e))?;
            file.flush()
                .await
                .map_err(|e| io_error("flush audit log file", &path, e))?;
        }

        Ok(())
    }

    /// Deletes day files whose date falls before `cutoff` and returns how many
    /// were removed. Files that do not match the `audit-YYYY-MM-DD.log` naming
    /// pattern are left alone.
    pub async fn prune_before(&self, cutoff: DateTime<Utc>) -> Result<usize, AppError> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            // Nothing was ever written; nothing to prune.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(io_error("read audit log directory", &self.dir, e)),
        };

        let mut removed = 0;

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| io_error("read audit log directory", &self.dir, e))?
        {
            let name = item.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(captures) = LOG_FILE_NAME.captures(name) else {
                continue;
            };
            let Ok(day) = NaiveDate::parse_from_str(&captures[1], "%Y-%m-%d") else {
                continue;
            };

            if day.and_time(NaiveTime::MIN) < cutoff.naive_utc() {
                match fs::remove_file(item.path()).await {
                    Ok(()) => removed += 1,
                    Err(e) => {
                        warn!(file = %name, error = %e, "Failed to remove expired audit log file");
                    }
                }
            }
        }

        Ok(removed)
    }

    /// Lists day files as `(file name, size in bytes)` pairs, sorted by name.
    pub async fn day_files(&self) -> Result<Vec<(String, u64)>, AppError> {
        let mut dir = match fs::read_dir(&self.dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error("read audit log directory", &self.dir, e)),
        };

        let mut files = Vec::new();

        while let Some(item) = dir
            .next_entry()
            .await
            .map_err(|e| io_error("read audit log directory", &self.dir, e))?
        {
            let name = item.file_name();
            let Some(name) = name.to_str() else { continue };
            if !LOG_FILE_NAME.is_match(name) {
                continue;
            }

            let size = item
                .metadata()
                .await
                .map_err(|e| io_error("read audit log file metadata", &item.path(), e))?
                .len();

            files.push((name.to_string(), size));
        }

        files.sort();
        Ok(files)
    }
}

fn io_error(action: &str, path: &Path, e: std::io::Error) -> AppError {
    AppError::internal(
        format!("Failed to {action}"),
        json!({ "path": path.display().to_string(), "source": e.to_string() }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audit::{AuditAction, AuditDraft};
    use chrono::TimeZone;

    fn entry(action: AuditAction) -> AuditEntry {
        AuditEntry::from_draft(
            action,
            AuditDraft {
                entity: Some("clientes".into()),
                ..AuditDraft::default()
            },
        )
    }

    #[tokio::test]
    async fn append_creates_day_file_with_one_json_line() {
        let tmp = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(tmp.path().join("audit"));

        let e = entry(AuditAction::Create);
        log.append(&e).await.unwrap();

        let expected = format!("audit-{}.log", e.timestamp.format("%Y-%m-%d"));
        let content = std::fs::read_to_string(log.dir().join(&expected)).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 1);

        let parsed: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed["action"], "CREATE");
        assert_eq!(parsed["entity"], "clientes");
    }

    #[tokio::test]
    async fn appends_accumulate_lines() {
        let tmp = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(tmp.path());

        log.append(&entry(AuditAction::Create)).await.unwrap();
        log.append(&entry(AuditAction::Delete)).await.unwrap();

        let files = log.day_files().await.unwrap();
        assert_eq!(files.len(), 1);

        let content = std::fs::read_to_string(log.dir().join(&files[0].0)).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[tokio::test]
    async fn batch_splits_across_days() {
        let tmp = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(tmp.path());

        let mut yesterday = entry(AuditAction::Create);
        yesterday.timestamp = Utc.with_ymd_and_hms(2026, 3, 1, 23, 59, 0).unwrap();
        let mut today = entry(AuditAction::Update);
        today.timestamp = Utc.with_ymd_and_hms(2026, 3, 2, 0, 1, 0).unwrap();

        log.append_batch(&[yesterday, today]).await.unwrap();

        let files = log.day_files().await.unwrap();
        let names: Vec<_> = files.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["audit-2026-03-01.log", "audit-2026-03-02.log"]);
    }

    #[tokio::test]
    async fn prune_removes_only_expired_day_files() {
        let tmp = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(tmp.path());

        std::fs::write(tmp.path().join("audit-2020-01-01.log"), "{}\n").unwrap();
        std::fs::write(tmp.path().join("audit-2099-01-01.log"), "{}\n").unwrap();
        std::fs::write(tmp.path().join("notes.txt"), "keep me").unwrap();
        std::fs::write(tmp.path().join("audit-garbage.log"), "keep me").unwrap();

        let cutoff = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let removed = log.prune_before(cutoff).await.unwrap();

        assert_eq!(removed, 1);
        assert!(!tmp.path().join("audit-2020-01-01.log").exists());
        assert!(tmp.path().join("audit-2099-01-01.log").exists());
        assert!(tmp.path().join("notes.txt").exists());
        assert!(tmp.path().join("audit-garbage.log").exists());
    }

    #[tokio::test]
    async fn prune_on_missing_directory_is_a_no_op() {
        let tmp = tempfile::tempdir().unwrap();
        let log = FileAuditLog::new(tmp.path().join("never-created"));

        let removed = log.prune_before(Utc::now()).await.unwrap();
        assert_eq!(removed, 0);
    }
}
