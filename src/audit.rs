/*!
 * Audit logging for collection operations
 *
 * Mirrors the original collector's `AuditLogger`: a thin, line-oriented log
 * of operations and failures, not a structured event bus. Consumers that
 * need machine-readable audit trails can implement [`AuditSink`] themselves.
 */

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::Utc;

use crate::error::Result;

/// A destination for audit records. The default `FileAuditSink` appends
/// human-readable lines to a file (or stderr if none is configured);
/// callers embedding the collector in a larger service can supply their
/// own sink (e.g. one that forwards to a SIEM).
pub trait AuditSink: Send + Sync {
    fn log_operation(&self, operation: &str, source: &Path, target: &Path, user: Option<&str>);
    fn log_error(&self, operation: &str, error: &str, context: &str);
    fn log_security_event(&self, event_type: &str, details: &str);
}

/// Default sink: appends to `log_file` if given, otherwise writes to stderr
/// via `tracing`. Never panics or propagates I/O failures to callers -
/// audit logging is best-effort and must not abort a collection run.
pub struct FileAuditSink {
    file: Option<Mutex<std::fs::File>>,
}

impl FileAuditSink {
    pub fn new(log_file: Option<&Path>) -> Result<Self> {
        let file = match log_file {
            Some(path) => {
                let f = OpenOptions::new().create(true).append(true).open(path)?;
                Some(Mutex::new(f))
            }
            None => None,
        };
        Ok(Self { file })
    }

    fn write_line(&self, line: &str) {
        match &self.file {
            Some(file) => {
                if let Ok(mut f) = file.lock() {
                    let _ = writeln!(f, "{}", line);
                }
            }
            None => tracing::info!(target: "audit", "{}", line),
        }
    }
}

impl AuditSink for FileAuditSink {
    fn log_operation(&self, operation: &str, source: &Path, target: &Path, user: Option<&str>) {
        let line = format!(
            "[{}] OPERATION: {} | source={} | target={} | user={}",
            Utc::now().to_rfc3339(),
            operation,
            source.display(),
            target.display(),
            user.unwrap_or("-")
        );
        self.write_line(&line);
    }

    fn log_error(&self, operation: &str, error: &str, context: &str) {
        let line = format!(
            "[{}] ERROR: {} | error={} | context={}",
            Utc::now().to_rfc3339(),
            operation,
            error,
            context
        );
        self.write_line(&line);
    }

    fn log_security_event(&self, event_type: &str, details: &str) {
        let line = format!(
            "[{}] SECURITY: {} | details={}",
            Utc::now().to_rfc3339(),
            event_type,
            details
        );
        self.write_line(&line);
    }
}

/// Resolves the log destination from config: `audit_log_file` if set,
/// otherwise no file is created and operations are logged through `tracing`.
pub fn sink_for(log_file: Option<&PathBuf>) -> Result<FileAuditSink> {
    FileAuditSink::new(log_file.map(|p| p.as_path()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_log_operation_appends_line() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let sink = FileAuditSink::new(Some(&log_path)).unwrap();

        sink.log_operation("copy", Path::new("/a"), Path::new("/b"), None);

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert!(contents.contains("OPERATION: copy"));
        assert!(contents.contains("source=/a"));
    }

    #[test]
    fn test_log_error_appends_line() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("audit.log");
        let sink = FileAuditSink::new(Some(&log_path)).unwrap();

        sink.log_error("copy", "permission denied", "file.txt");

        let contents = std::fs::read_to_string(&log_path).unwrap();
        assert!(contents.contains("ERROR: copy"));
        assert!(contents.contains("permission denied"));
    }

    #[test]
    fn test_no_file_does_not_error() {
        let sink = FileAuditSink::new(None).unwrap();
        sink.log_operation("copy", Path::new("/a"), Path::new("/b"), None);
    }
}
