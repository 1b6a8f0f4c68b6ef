/*!
 * Pre-flight validation: config structure, path existence, disk space, and
 * a ReDoS canary for user-supplied regex patterns.
 */

use std::path::Path;
use sysinfo::Disks;

use crate::config::{validate_structure, CollectionConfig, PatternKind};
use crate::error::{CollectorError, Result};

/// The five bracket shapes that the original collector flags as
/// catastrophic-backtracking risks: a repeated group, itself repeated.
const REDOS_SHAPES: [&str; 5] = [
    r"\(.*\+.*\)\+",
    r"\(.*\*.*\)\*",
    r"\(.*\?.*\)\?",
    r"\(.*\{.*,.*\}.*\)\+",
    r"\(.*\{.*,.*\}.*\)\*",
];

fn looks_redos_prone(pattern: &str) -> bool {
    REDOS_SHAPES.iter().any(|shape| {
        regex::Regex::new(shape)
            .map(|re| re.is_match(pattern))
            .unwrap_or(false)
    })
}

/// Full pre-flight validation of a collection config: structural checks,
/// existence/type checks on every source and the target's parent, and a
/// ReDoS canary over any regex patterns.
pub fn validate(config: &CollectionConfig) -> Result<()> {
    validate_structure(config)?;

    for source in &config.source_paths {
        if !source.exists() {
            return Err(CollectorError::PathError(format!(
                "source path does not exist: {}",
                source.display()
            )));
        }
        if !source.is_dir() && !source.is_file() {
            return Err(CollectorError::PathError(format!(
                "source path is neither a file nor a directory: {}",
                source.display()
            )));
        }
    }

    if let Some(parent) = config.target_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            return Err(CollectorError::PathError(format!(
                "target path's parent directory does not exist: {}",
                parent.display()
            )));
        }
    }
    if config.target_path.exists() && !config.target_path.is_dir() {
        return Err(CollectorError::PathError(format!(
            "target path exists and is not a directory: {}",
            config.target_path.display()
        )));
    }

    for pattern in &config.patterns {
        if pattern.pattern_type == PatternKind::Regex && looks_redos_prone(&pattern.pattern) {
            return Err(CollectorError::Validation(format!(
                "regex pattern rejected as potentially catastrophic: {}",
                pattern.pattern
            )));
        }
    }

    Ok(())
}

/// Check that the disk backing `destination` has at least `required` bytes
/// free. Raises `PathError` if the free-space probe itself fails (the
/// destination's disk can't be identified), matching the source
/// collector's `validate_disk_space`, which raises on the equivalent
/// `OSError`.
pub fn has_disk_space(destination: &Path, required: u64) -> Result<bool> {
    let disks = Disks::new_with_refreshed_list();
    let disk = disks
        .iter()
        .filter(|disk| destination.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len());

    match disk {
        Some(disk) => Ok(disk.available_space() >= required),
        None => Err(CollectorError::PathError(format!(
            "could not determine available disk space for {}",
            destination.display()
        ))),
    }
}
