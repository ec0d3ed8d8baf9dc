//! Copy sessions and the ledger to a shared directory.

use std::fs;
use std::path::{Path, PathBuf};

use framemark_core::Result;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of copying one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncEntry {
    pub file: PathBuf,
    /// `None` on success
    pub error: Option<String>,
}

/// Per-file results of a sync run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SyncReport {
    pub target: PathBuf,
    pub entries: Vec<SyncEntry>,
    pub warnings: Vec<String>,
}

impl SyncReport {
    pub fn copied(&self) -> usize {
        self.entries.iter().filter(|e| e.error.is_none()).count()
    }

    pub fn failed(&self) -> usize {
        self.entries.len() - self.copied()
    }

    fn record(&mut self, file: PathBuf, result: std::io::Result<u64>) {
        match result {
            Ok(_) => {
                info!(file = %file.display(), target = %self.target.display(), "Synced");
                self.entries.push(SyncEntry { file, error: None });
            }
            Err(e) => {
                warn!(file = %file.display(), target = %self.target.display(), error = %e, "Sync copy failed");
                self.entries.push(SyncEntry {
                    file,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    fn warn(&mut self, message: String) {
        warn!(target_dir = %self.target.display(), "{}", message);
        self.warnings.push(message);
    }
}

fn copy_into(file: &Path, target: &Path) -> std::io::Result<u64> {
    let name = file.file_name().ok_or_else(|| {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, "path has no file name")
    })?;
    fs::copy(file, target.join(name))
}

/// Copy every `*.json` session file and the ledger into `target`.
///
/// Problems with individual files are reported per file. A target directory
/// that cannot be created is an error, since nothing could be copied.
pub fn sync_sessions(session_dir: &Path, ledger_path: &Path, target: &Path) -> Result<SyncReport> {
    fs::create_dir_all(target).map_err(|e| {
        warn!(target_dir = %target.display(), error = %e, "Sync target unavailable");
        e
    })?;

    let mut report = SyncReport {
        target: target.to_path_buf(),
        ..Default::default()
    };

    match fs::read_dir(session_dir) {
        Ok(entries) => {
            let mut sessions: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| {
                    p.is_file()
                        && p.extension()
                            .map(|ext| ext.eq_ignore_ascii_case("json"))
                            .unwrap_or(false)
                })
                .collect();
            sessions.sort();
            if sessions.is_empty() {
                report.warn(format!("no session files in {}", session_dir.display()));
            }
            for path in sessions {
                let result = copy_into(&path, target);
                report.record(path, result);
            }
        }
        Err(e) => {
            report.warn(format!("session directory {} unreadable: {}", session_dir.display(), e));
        }
    }

    if ledger_path.is_file() {
        let result = copy_into(ledger_path, target);
        report.record(ledger_path.to_path_buf(), result);
    } else {
        report.warn(format!("ledger {} not found", ledger_path.display()));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_copies_sessions_and_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = dir.path().join("sessions");
        fs::create_dir(&sessions).unwrap();
        fs::write(sessions.join("alice_session.json"), "{}").unwrap();
        fs::write(sessions.join("bob_session.JSON"), "{}").unwrap();
        fs::write(sessions.join("notes.txt"), "skip").unwrap();
        let ledger = dir.path().join("annotations.csv");
        fs::write(&ledger, "user_id\n").unwrap();
        let target = dir.path().join("share");

        let report = sync_sessions(&sessions, &ledger, &target).unwrap();
        assert_eq!(report.copied(), 3);
        assert_eq!(report.failed(), 0);
        assert!(report.warnings.is_empty());
        assert!(target.join("alice_session.json").exists());
        assert!(target.join("annotations.csv").exists());
        assert!(!target.join("notes.txt").exists());
    }

    #[test]
    fn test_sync_missing_session_dir_warns() {
        let dir = tempfile::tempdir().unwrap();
        let report = sync_sessions(
            &dir.path().join("nope"),
            &dir.path().join("nope.csv"),
            &dir.path().join("share"),
        )
        .unwrap();
        assert!(report.entries.is_empty());
        assert_eq!(report.warnings.len(), 2);
    }

    #[test]
    fn test_sync_unreachable_target_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let sessions = dir.path().join("sessions");
        fs::create_dir(&sessions).unwrap();
        fs::write(sessions.join("alice_session.json"), "{}").unwrap();
        // a regular file where the share directory should be
        let blocked = dir.path().join("share");
        fs::write(&blocked, "not a directory").unwrap();

        let result = sync_sessions(&sessions, &dir.path().join("a.csv"), &blocked.join("sub"));
        assert!(matches!(result, Err(framemark_core::Error::Io(_))));
    }
}
