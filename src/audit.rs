//! Append-only event logs
//!
//! One file per event class, one `[timestamp] message` line per event.
//! An unwritable log path degrades to a `tracing` warning and a no-op;
//! nothing here can abort the engine.

use crate::config::StorePaths;
use crate::store::TIME_FORMAT;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A single append-only event log file.
pub struct EventLog {
    path: PathBuf,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one timestamped line, creating the file on first use.
    pub fn append(&self, message: &str) {
        let line = format!("[{}] {}\n", Utc::now().format(TIME_FORMAT), message);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .and_then(|mut file| file.write_all(line.as_bytes()));
        if let Err(e) = result {
            warn!("event log {} unwritable: {}", self.path.display(), e);
        }
    }
}

/// The engine's four event classes.
pub struct EventLogs {
    /// Queue-full rejections
    pub overflow: EventLog,
    /// Validation and I/O error events
    pub error: EventLog,
    /// Escalation sweep summaries
    pub escalation: EventLog,
    /// Duplicate policy rejections, distinct from validation failures
    pub duplicate: EventLog,
}

impl EventLogs {
    pub fn new(paths: &StorePaths) -> Self {
        Self {
            overflow: EventLog::new(&paths.overflow_log),
            error: EventLog::new(&paths.error_log),
            escalation: EventLog::new(&paths.escalation_log),
            duplicate: EventLog::new(&paths.duplicate_log),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_append_creates_and_accumulates() {
        let dir = tempdir().unwrap();
        let log = EventLog::new(dir.path().join("events.txt"));
        log.append("first event");
        log.append("second event");

        let content = std::fs::read_to_string(log.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with('['));
        assert!(lines[0].ends_with("first event"));
        assert!(lines[1].ends_with("second event"));
    }

    #[test]
    fn test_unwritable_path_is_a_noop() {
        let log = EventLog::new("/nonexistent-dir/events.txt");
        // must not panic or error out
        log.append("dropped on the floor");
    }
}
