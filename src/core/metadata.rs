/*!
 * File metadata preservation (timestamps, permissions)
 */

use crate::error::{CollectorError, Result};
use filetime::{set_file_times, FileTime};
use std::path::Path;

/// Preserve file metadata from source to destination, best-effort per
/// platform (permission bits are a no-op on targets that don't support them).
pub fn preserve_metadata(source_path: &Path, dest_path: &Path) -> Result<()> {
    let metadata = std::fs::metadata(source_path).map_err(|e| {
        CollectorError::FileOperation(format!("failed to read source metadata: {}", e))
    })?;

    std::fs::set_permissions(dest_path, metadata.permissions())
        .map_err(|e| CollectorError::FileOperation(format!("failed to set permissions: {}", e)))?;

    let accessed = FileTime::from_last_access_time(&metadata);
    let modified = FileTime::from_last_modification_time(&metadata);

    set_file_times(dest_path, accessed, modified)
        .map_err(|e| CollectorError::FileOperation(format!("failed to set timestamps: {}", e)))?;

    Ok(())
}
