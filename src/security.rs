/*!
 * Path sanitization and traversal guards
 *
 * Ported from the Python collector's `path_sanitizer` / `security_constants`
 * modules. The dangerous-character set is kept identical across platforms
 * rather than relaxed on POSIX, so a sanitized path behaves the same way
 * regardless of where the collector runs.
 */

use std::path::{Component, Path, PathBuf};

use crate::error::{CollectorError, Result};

pub const MAX_PATH_LENGTH: usize = 4096;
pub const MAX_PATTERN_LENGTH: usize = 1000;
pub const MAX_SOURCE_PATHS: usize = 1000;
pub const MAX_REQUEST_SIZE_MB: usize = 10;
pub const MAX_REQUEST_SIZE_BYTES: usize = MAX_REQUEST_SIZE_MB * 1024 * 1024;

const DANGEROUS_CHARS: [char; 7] = ['<', '>', '"', '|', '?', '*', '\0'];

const WINDOWS_RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

const POSIX_RESERVED_NAMES: &[&str] = &[".", ".."];

fn is_windows_reserved(segment: &str) -> bool {
    let stem = segment.split('.').next().unwrap_or(segment);
    WINDOWS_RESERVED_NAMES
        .iter()
        .any(|name| name.eq_ignore_ascii_case(stem))
}

fn is_posix_reserved(segment: &str) -> bool {
    POSIX_RESERVED_NAMES.contains(&segment)
}

/// Validate length, dangerous characters, and reserved names for every
/// component of `path`, then return its normalized absolute form. Does not
/// touch the filesystem and does not itself guard against `..` traversal;
/// callers that resolve a path relative to a trusted base should also call
/// [`resolve_within`].
pub fn sanitize(path: &Path) -> Result<PathBuf> {
    let path_str = path.to_string_lossy();
    if path_str.len() > MAX_PATH_LENGTH {
        return Err(CollectorError::security(format!(
            "path exceeds maximum length of {} characters",
            MAX_PATH_LENGTH
        )));
    }

    for component in path.components() {
        if let Component::Normal(segment) = component {
            let segment = segment.to_string_lossy();
            if segment.chars().any(|c| DANGEROUS_CHARS.contains(&c)) {
                return Err(CollectorError::security(format!(
                    "path segment '{}' contains a disallowed character",
                    segment
                )));
            }
            if is_windows_reserved(&segment) {
                return Err(CollectorError::security(format!(
                    "path segment '{}' is a reserved device name",
                    segment
                )));
            }
        } else if let Component::ParentDir = component {
            if is_posix_reserved("..") {
                return Err(CollectorError::security(
                    "bare '..' is not a permitted path segment",
                ));
            }
        }
    }

    Ok(normalize(path))
}

/// Lexically normalize `path` to an absolute form without touching the
/// filesystem (mirrors `os.path.normpath` + `os.path.abspath`).
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| PathBuf::from("."))
            .join(path)
    };

    let mut out = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Lexically normalize `path`, then resolve symlinks on as much of it as
/// actually exists on disk: walk up to the deepest existing ancestor,
/// `canonicalize` that ancestor (following any symlinks in it), and
/// re-append the remaining, not-yet-created components unchanged. This is
/// what lets [`is_within`] catch a symlink planted inside `base` that
/// points outside it, even though the full candidate path (symlink target
/// plus an as-yet-uncreated file name) doesn't exist yet.
fn real_path_best_effort(path: &Path) -> PathBuf {
    let normalized = normalize(path);

    let mut existing: &Path = &normalized;
    let mut pending: Vec<&std::ffi::OsStr> = Vec::new();
    loop {
        if existing.exists() {
            break;
        }
        match (existing.file_name(), existing.parent()) {
            (Some(name), Some(parent)) => {
                pending.push(name);
                existing = parent;
            }
            _ => break,
        }
    }

    let mut resolved = existing
        .canonicalize()
        .unwrap_or_else(|_| existing.to_path_buf());
    for component in pending.into_iter().rev() {
        resolved.push(component);
    }
    resolved
}

/// Returns true if `candidate` resolves to a location at or under `base`,
/// after resolving symlinks on both sides.
pub fn is_within(base: &Path, candidate: &Path) -> bool {
    let base = real_path_best_effort(base);
    let candidate = real_path_best_effort(candidate);
    candidate.starts_with(&base)
}

/// Join `relative` onto `base` and confirm the result does not escape
/// `base` via `..` segments (forward- or backslash-delimited) or via a
/// symlink planted inside `base` that points elsewhere. Rejects an
/// absolute `relative` path outright.
pub fn resolve_within(base: &Path, relative: &Path) -> Result<PathBuf> {
    if relative.is_absolute() {
        return Err(CollectorError::security(
            "relative path must not be absolute",
        ));
    }

    let relative_str = relative.to_string_lossy().replace('\\', "/");
    if relative_str.split('/').any(|part| part == "..") {
        return Err(CollectorError::security(
            "relative path attempts to traverse above its base directory",
        ));
    }

    let joined = normalize(&base.join(relative));
    if !is_within(base, &joined) {
        return Err(CollectorError::security(
            "resolved path escapes its base directory",
        ));
    }

    Ok(joined)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_rejects_dangerous_chars() {
        let path = Path::new("/tmp/bad<name>.txt");
        assert!(sanitize(path).is_err());
    }

    #[test]
    fn test_sanitize_rejects_reserved_name() {
        let path = Path::new("/tmp/CON.txt");
        assert!(sanitize(path).is_err());
    }

    #[test]
    fn test_sanitize_rejects_overlong_path() {
        let long_segment = "a".repeat(MAX_PATH_LENGTH + 1);
        let path = PathBuf::from(format!("/tmp/{}", long_segment));
        assert!(sanitize(&path).is_err());
    }

    #[test]
    fn test_sanitize_accepts_normal_path() {
        let path = Path::new("/tmp/reports/q4.csv");
        assert!(sanitize(path).is_ok());
    }

    #[test]
    fn test_is_within() {
        assert!(is_within(Path::new("/data"), Path::new("/data/sub/file.txt")));
        assert!(!is_within(Path::new("/data"), Path::new("/etc/passwd")));
    }

    #[test]
    #[cfg(unix)]
    fn test_is_within_rejects_symlink_planted_inside_base() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("target_base");
        std::fs::create_dir_all(&base).unwrap();
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();

        // an attacker-planted symlink inside the target directory pointing
        // at a location outside it
        symlink(&outside, base.join("evil")).unwrap();

        let candidate = base.join("evil").join("passwd");
        assert!(!is_within(&base, &candidate));
    }

    #[test]
    #[cfg(unix)]
    fn test_resolve_within_rejects_symlink_planted_inside_base() {
        use std::os::unix::fs::symlink;

        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("target_base");
        std::fs::create_dir_all(&base).unwrap();
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&outside).unwrap();

        symlink(&outside, base.join("evil")).unwrap();

        assert!(resolve_within(&base, Path::new("evil/passwd")).is_err());
    }

    #[test]
    fn test_resolve_within_rejects_traversal() {
        let base = Path::new("/data/target");
        assert!(resolve_within(base, Path::new("../../etc/passwd")).is_err());
        assert!(resolve_within(base, Path::new("..\\..\\etc\\passwd")).is_err());
    }

    #[test]
    fn test_resolve_within_rejects_absolute() {
        let base = Path::new("/data/target");
        assert!(resolve_within(base, Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn test_resolve_within_accepts_nested_relative() {
        let base = Path::new("/data/target");
        let resolved = resolve_within(base, Path::new("sub/dir/file.txt")).unwrap();
        assert_eq!(resolved, Path::new("/data/target/sub/dir/file.txt"));
    }
}
