//! Human-readable audit trail.
//!
//! The store reports every state change here but never reads the log back.
//! Writes are fire-and-forget: a failed append is dropped, never returned.

use chrono::Local;
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::models::UserId;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Receiver for audit events.
pub trait AuditSink: Send + Sync {
    /// Records an event attributed to a user.
    fn user(&self, id: UserId, name: &str, action: &str);
    /// Records an internal event.
    fn system(&self, action: &str);
}

/// Appends audit lines to a text file.
///
/// Each append takes an exclusive advisory lock so concurrent processes do
/// not interleave partial lines. If the lock is busy the line is dropped.
pub struct FileAuditLog {
    path: PathBuf,
    guard: Mutex<()>,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), guard: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, line: &str) {
        let _guard = self.guard.lock();
        let result = (|| -> std::io::Result<()> {
            let mut f = OpenOptions::new().create(true).append(true).open(&self.path)?;
            if f.try_lock_exclusive().is_err() {
                return Ok(());
            }
            let written = writeln!(f, "{}", line);
            let _ = f.unlock();
            written
        })();
        if let Err(e) = result {
            tracing::debug!(path = %self.path.display(), error = %e, "audit append failed");
        }
    }
}

impl AuditSink for FileAuditLog {
    fn user(&self, id: UserId, name: &str, action: &str) {
        self.append(&user_line(&timestamp(), id, name, action));
    }

    fn system(&self, action: &str) {
        self.append(&system_line(&timestamp(), action));
    }
}

/// Keeps audit lines in memory. Used by tests and embedders that want to
/// inspect what happened.
#[derive(Default)]
pub struct MemoryAuditLog {
    lines: Mutex<Vec<String>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// True if any recorded line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|l| l.contains(needle))
    }
}

impl AuditSink for MemoryAuditLog {
    fn user(&self, id: UserId, name: &str, action: &str) {
        self.lines.lock().push(user_line(&timestamp(), id, name, action));
    }

    fn system(&self, action: &str) {
        self.lines.lock().push(system_line(&timestamp(), action));
    }
}

/// Discards everything.
pub struct NullAuditLog;

impl AuditSink for NullAuditLog {
    fn user(&self, _id: UserId, _name: &str, _action: &str) {}
    fn system(&self, _action: &str) {}
}

fn timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

fn user_line(ts: &str, id: UserId, name: &str, action: &str) -> String {
    format!("[{}] User {} ({}): {}", ts, id, name, action)
}

fn system_line(ts: &str, action: &str) -> String {
    format!("[{}] SYSTEM: {}", ts, action)
}
