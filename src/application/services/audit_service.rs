//! Buffered audit pipeline with a critical-action fast path.
//!
//! Entries flow through three stages: redaction (at entry construction),
//! level filtering, and persistence. Critical actions skip the buffer and are
//! written immediately; everything else accumulates until the buffer fills or
//! the periodic flush fires. Persistence prefers the database and falls back
//! to per-day files, so the pipeline stays best-effort all the way down.

use metrics::counter;
use std::mem;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::domain::audit::{AuditAction, AuditDraft, AuditEntry, AuditLevel};
use crate::domain::repositories::AuditRepository;
use crate::infrastructure::persistence::FileAuditLog;

/// Buffered entries are flushed once this many accumulate.
pub const BUFFER_CAPACITY: usize = 50;

/// The periodic flush interval for a partially filled buffer.
pub const FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Audit entry sink with buffering, level filtering and retention.
pub struct AuditLogger {
    level: AuditLevel,
    retention_days: u32,
    buffer: Mutex<Vec<AuditEntry>>,
    file: FileAuditLog,
    repository: Option<Arc<dyn AuditRepository>>,
}

impl AuditLogger {
    /// Creates a pipeline writing to `repository` when given, with `file` as
    /// the fallback (and the only sink otherwise).
    pub fn new(
        level: AuditLevel,
        file: FileAuditLog,
        repository: Option<Arc<dyn AuditRepository>>,
        retention_days: u32,
    ) -> Self {
        Self {
            level,
            retention_days,
            buffer: Mutex::new(Vec::new()),
            file,
            repository,
        }
    }

    /// Configured verbosity level.
    pub fn level(&self) -> AuditLevel {
        self.level
    }

    fn lock_buffer(&self) -> MutexGuard<'_, Vec<AuditEntry>> {
        self.buffer.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of entries currently waiting in the buffer.
    pub fn buffered(&self) -> usize {
        self.lock_buffer().len()
    }

    /// Records one audit event.
    ///
    /// Critical actions (deletes, auth events, permission changes, exports,
    /// backup/restore) are persisted immediately regardless of the configured
    /// level. Everything else is dropped if the level excludes it, or
    /// buffered until the next flush.
    pub async fn log(&self, action: AuditAction, draft: AuditDraft) {
        let entry = AuditEntry::from_draft(action, draft);

        if entry.action.is_critical() {
            self.persist_batch(vec![entry]).await;
            return;
        }

        if !entry.passes_level(self.level) {
            return;
        }

        let flush_now = {
            let mut buffer = self.lock_buffer();
            buffer.push(entry);
            buffer.len() >= BUFFER_CAPACITY
        };

        if flush_now {
            self.flush().await;
        }
    }

    /// Drains the buffer and persists its contents.
    ///
    /// The buffer is swapped out under the lock before any I/O starts, so
    /// entries logged while a flush is in flight land in the fresh buffer
    /// instead of being lost or written twice.
    pub async fn flush(&self) {
        let entries = mem::take(&mut *self.lock_buffer());
        if entries.is_empty() {
            return;
        }

        debug!(count = entries.len(), "Flushing audit buffer");
        self.persist_batch(entries).await;
    }

    async fn persist_batch(&self, entries: Vec<AuditEntry>) {
        match &self.repository {
            Some(repository) => {
                let mut fallback = Vec::new();

                for entry in entries {
                    match repository.insert(&entry).await {
                        Ok(()) => {
                            counter!("audit_entries_written_total", "sink" => "db").increment(1);
                        }
                        Err(e) => {
                            warn!(
                                error = %e,
                                action = entry.action.as_str(),
                                "Audit insert failed, falling back to file"
                            );
                            fallback.push(entry);
                        }
                    }
                }

                if !fallback.is_empty() {
                    self.append_to_file(fallback).await;
                }
            }
            None => self.append_to_file(entries).await,
        }
    }

    async fn append_to_file(&self, entries: Vec<AuditEntry>) {
        let count = entries.len() as u64;

        match self.file.append_batch(&entries).await {
            Ok(()) => {
                counter!("audit_entries_written_total", "sink" => "file").increment(count);
            }
            Err(e) => {
                // Best-effort pipeline: with both sinks down the entries are
                // dropped, not retried.
                counter!("audit_entries_dropped_total").increment(count);
                error!(error = %e, count, "Audit file write failed, entries dropped");
            }
        }
    }

    /// Removes persisted history older than the retention window.
    ///
    /// Returns `(day files removed, database rows removed)`. Failures on one
    /// sink are logged and do not stop cleanup of the other.
    pub async fn clean_old_logs(&self) -> (usize, u64) {
        let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(self.retention_days));

        let files = match self.file.prune_before(cutoff).await {
            Ok(removed) => removed,
            Err(e) => {
                warn!(error = %e, "Audit file retention cleanup failed");
                0
            }
        };

        let rows = match &self.repository {
            Some(repository) => match repository.prune_before(cutoff).await {
                Ok(removed) => removed,
                Err(e) => {
                    warn!(error = %e, "Audit table retention cleanup failed");
                    0
                }
            },
            None => 0,
        };

        (files, rows)
    }

    /// Spawns the periodic buffer flush. Runs until the process exits.
    pub fn spawn_flusher(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // Skip the immediate first tick.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                self.flush().await;
            }
        })
    }
}
