/*!
 * File operation strategies: copy, move, move-and-remove
 */

use std::path::Path;

use crate::config::OperationMode;
use crate::core::metadata::preserve_metadata;
use crate::error::{CollectorError, Result};

/// Executes a single file operation according to an `OperationMode`.
#[derive(Debug, Clone, Copy)]
pub struct Strategy(OperationMode);

impl Strategy {
    pub fn for_mode(mode: OperationMode) -> Self {
        Strategy(mode)
    }

    pub fn execute(&self, source: &Path, target: &Path) -> Result<()> {
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                CollectorError::FileOperation(format!(
                    "failed to create parent directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        match self.0 {
            OperationMode::Copy => {
                std::fs::copy(source, target).map_err(|e| {
                    CollectorError::FileOperation(format!(
                        "failed to copy {} to {}: {}",
                        source.display(),
                        target.display(),
                        e
                    ))
                })?;
                // Best-effort: a copy that can't preserve mtime/permissions
                // (e.g. a read-only target filesystem) should still count as
                // a successful collection, not fail the whole operation.
                if let Err(e) = preserve_metadata(source, target) {
                    tracing::warn!(
                        "could not preserve metadata for {}: {}",
                        target.display(),
                        e
                    );
                }
            }
            OperationMode::Move => {
                move_file(source, target)?;
            }
            OperationMode::MoveRemove => {
                move_file(source, target)?;
                if source.exists() {
                    std::fs::remove_file(source).map_err(|e| {
                        CollectorError::FileOperation(format!(
                            "moved {} but failed to remove source: {}",
                            source.display(),
                            e
                        ))
                    })?;
                }
            }
        }
        Ok(())
    }
}

fn move_file(source: &Path, target: &Path) -> Result<()> {
    if std::fs::rename(source, target).is_ok() {
        return Ok(());
    }
    // rename fails across filesystems; fall back to copy + delete.
    std::fs::copy(source, target).map_err(|e| {
        CollectorError::FileOperation(format!(
            "failed to move {} to {}: {}",
            source.display(),
            target.display(),
            e
        ))
    })?;
    std::fs::remove_file(source).map_err(|e| {
        CollectorError::FileOperation(format!(
            "copied {} to {} but failed to remove source: {}",
            source.display(),
            target.display(),
            e
        ))
    })?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_copy_strategy_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.txt");
        std::fs::write(&source, b"data").unwrap();
        let target = dir.path().join("nested/dest.txt");

        Strategy::for_mode(OperationMode::Copy)
            .execute(&source, &target)
            .unwrap();

        assert!(target.exists());
        assert!(source.exists());
    }

    #[test]
    fn test_move_remove_strategy_deletes_source() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("source.txt");
        std::fs::write(&source, b"data").unwrap();
        let target = dir.path().join("dest.txt");

        Strategy::for_mode(OperationMode::MoveRemove)
            .execute(&source, &target)
            .unwrap();

        assert!(target.exists());
        assert!(!source.exists());
    }
}
