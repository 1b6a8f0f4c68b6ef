/*!
 * File operations facade: security precondition checks, strategy dispatch,
 * and audit logging around a single source -> target step.
 */

use std::path::Path;

use crate::audit::AuditSink;
use crate::config::OperationMode;
use crate::core::strategy::Strategy;
use crate::error::{CollectorError, Result};
use crate::security;

/// Wraps a [`Strategy`] with the security and audit steps every file
/// operation must go through, regardless of copy/move/move-remove mode.
pub struct FileOperations {
    strategy: Strategy,
    audit: Option<Box<dyn AuditSink>>,
}

impl FileOperations {
    pub fn new(mode: OperationMode) -> Self {
        Self {
            strategy: Strategy::for_mode(mode),
            audit: None,
        }
    }

    pub fn with_audit_sink(mut self, sink: Box<dyn AuditSink>) -> Self {
        self.audit = Some(sink);
        self
    }

    /// Length and dangerous-character checks only. Traversal protection is
    /// the caller's responsibility (the worker pool resolves `target` via
    /// [`security::resolve_within`] before this is ever called).
    fn validate_path_security(path: &Path) -> Result<()> {
        if path.to_string_lossy().len() > security::MAX_PATH_LENGTH {
            return Err(CollectorError::security(format!(
                "path exceeds maximum length: {}",
                path.display()
            )));
        }
        let dangerous = ['<', '>', '"', '|', '?', '*', '\0'];
        if path
            .to_string_lossy()
            .chars()
            .any(|c| dangerous.contains(&c))
        {
            return Err(CollectorError::security(format!(
                "path contains a disallowed character: {}",
                path.display()
            )));
        }
        Ok(())
    }

    pub fn execute_operation(&self, source: &Path, target: &Path) -> Result<()> {
        Self::validate_path_security(source)?;
        Self::validate_path_security(target)?;

        match self.strategy.execute(source, target) {
            Ok(()) => {
                if let Some(sink) = &self.audit {
                    sink.log_operation("collect", source, target, None);
                }
                Ok(())
            }
            Err(e) => {
                if let Some(sink) = &self.audit {
                    sink.log_error("collect", &e.to_string(), &source.display().to_string());
                }
                Err(CollectorError::FileOperation(format!(
                    "{} -> {}: {}",
                    source.display(),
                    target.display(),
                    e
                )))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_execute_operation_copies_file() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.txt");
        std::fs::write(&source, b"data").unwrap();
        let target = dir.path().join("out/a.txt");

        let ops = FileOperations::new(OperationMode::Copy);
        ops.execute_operation(&source, &target).unwrap();

        assert!(target.exists());
    }

    #[test]
    fn test_rejects_dangerous_target() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("a.txt");
        std::fs::write(&source, b"data").unwrap();
        let target = dir.path().join("bad|name.txt");

        let ops = FileOperations::new(OperationMode::Copy);
        assert!(ops.execute_operation(&source, &target).is_err());
    }
}
