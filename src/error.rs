/*!
 * Error types for the collector
 */

use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CollectorError>;

/// Root error type. Variant names mirror the exception hierarchy the
/// collection service was ported from, so log lines and exit-code mapping
/// stay stable across the rewrite.
#[derive(Debug, Error)]
pub enum CollectorError {
    /// Config or argument failed validation before any work started.
    #[error("validation error: {0}")]
    Validation(String),

    /// A path failed sanitization, traversal checks, or resolution.
    #[error("path error: {0}")]
    PathError(String),

    /// A copy/move/remove step on a concrete file failed.
    #[error("file operation error: {0}")]
    FileOperation(String),

    /// The supplied `CollectionConfig` was structurally invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A sanitized path, pattern, or request exceeded a security limit.
    #[error("security violation: {0}")]
    SecurityViolation(String),

    /// A glob/regex filter pattern could not be compiled or applied.
    #[error("filter error: {0}")]
    Filter(#[from] crate::core::filter::FilterError),

    /// The worker pool failed to execute or join its workers.
    #[error("worker pool error: {0}")]
    WorkerPool(String),

    /// Progress tracker state was used incorrectly (e.g. double flush panic guard).
    #[error("progress tracking error: {0}")]
    ProgressTracking(String),

    /// Archive creation failed.
    #[error("archive error: {0}")]
    Archive(String),

    /// Underlying I/O failure not otherwise classified above.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Anything else, carrying a free-form message.
    #[error("{0}")]
    Other(String),
}

impl CollectorError {
    pub fn path_error(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        CollectorError::PathError(format!("{}: {}", path.into().display(), reason))
    }

    pub fn security(reason: impl Into<String>) -> Self {
        CollectorError::SecurityViolation(reason.into())
    }

    /// Category used for CLI exit-code mapping; all operational errors
    /// currently map to the same non-zero code, but keeping the
    /// categorization explicit matches how the original CLI branched on
    /// exception type rather than on a single catch-all.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CollectorError::Validation(_) => ErrorCategory::Validation,
            CollectorError::PathError(_) => ErrorCategory::Path,
            CollectorError::FileOperation(_) => ErrorCategory::FileOperation,
            CollectorError::Configuration(_) => ErrorCategory::Configuration,
            CollectorError::SecurityViolation(_) => ErrorCategory::Security,
            CollectorError::Filter(_) => ErrorCategory::Filter,
            CollectorError::WorkerPool(_) => ErrorCategory::WorkerPool,
            CollectorError::ProgressTracking(_) => ErrorCategory::ProgressTracking,
            CollectorError::Archive(_) => ErrorCategory::Archive,
            CollectorError::Io(_) => ErrorCategory::Io,
            CollectorError::Other(_) => ErrorCategory::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Path,
    FileOperation,
    Configuration,
    Security,
    Filter,
    WorkerPool,
    ProgressTracking,
    Archive,
    Io,
    Unknown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CollectorError::SecurityViolation("path too long".to_string());
        assert_eq!(err.to_string(), "security violation: path too long");
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(
            CollectorError::Validation("x".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(
            CollectorError::Archive("x".into()).category(),
            ErrorCategory::Archive
        );
    }

    #[test]
    fn test_io_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "missing");
        let err: CollectorError = io_err.into();
        assert_eq!(err.category(), ErrorCategory::Io);
    }

    #[test]
    fn test_filter_error_conversion() {
        use crate::config::PatternSpec;
        use crate::core::filter::FileFilter;

        let filter = FileFilter::new();
        let filter_err = filter
            .matches(std::path::Path::new("a.txt"), &PatternSpec::regex("(a+)++"))
            .unwrap_err();
        let err: CollectorError = filter_err.into();
        assert_eq!(err.category(), ErrorCategory::Filter);
        assert!(matches!(err, CollectorError::Filter(_)));
    }
}
