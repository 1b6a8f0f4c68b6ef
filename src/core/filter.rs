/*!
 * Pattern-based file filtering with a match-result cache
 */

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use glob::Pattern as GlobPattern;
use regex::Regex;
use thiserror::Error;

use crate::config::{PatternKind, PatternSpec};

#[derive(Error, Debug)]
pub enum FilterError {
    #[error("invalid glob pattern '{pattern}': {source}")]
    InvalidGlob {
        pattern: String,
        source: glob::PatternError,
    },

    #[error("invalid regex pattern '{pattern}': {source}")]
    InvalidRegex {
        pattern: String,
        source: regex::Error,
    },
}

fn match_glob(filename: &str, pattern: &str) -> Result<bool, FilterError> {
    let compiled = GlobPattern::new(pattern).map_err(|e| FilterError::InvalidGlob {
        pattern: pattern.to_string(),
        source: e,
    })?;
    Ok(compiled.matches(filename))
}

fn match_regex(path_str: &str, pattern: &str) -> Result<bool, FilterError> {
    let compiled = Regex::new(pattern).map_err(|e| FilterError::InvalidRegex {
        pattern: pattern.to_string(),
        source: e,
    })?;
    Ok(compiled.is_match(path_str))
}

/// Evaluates `patterns` against candidate files, memoizing each
/// `(path, pattern, pattern_type)` match so repeated passes over a large
/// tree (e.g. a rescan after a partial failure) don't recompile or rematch.
#[derive(Debug, Default)]
pub struct FileFilter {
    cache: Mutex<HashMap<String, bool>>,
}

impl FileFilter {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn cache_key(path: &Path, pattern: &PatternSpec) -> String {
        format!(
            "{}:{}:{:?}",
            path.display(),
            pattern.pattern,
            pattern.pattern_type
        )
    }

    /// Check whether `path` matches a single pattern. Glob patterns match
    /// against the file's basename only (like `fnmatch`); regex patterns
    /// match against the full path string.
    pub fn matches(&self, path: &Path, pattern: &PatternSpec) -> Result<bool, FilterError> {
        let key = Self::cache_key(path, pattern);
        if let Some(&cached) = self.cache.lock().unwrap().get(&key) {
            return Ok(cached);
        }

        let result = match pattern.pattern_type {
            PatternKind::Glob => {
                let filename = path.file_name().map(|n| n.to_string_lossy().into_owned());
                match filename {
                    Some(name) => match_glob(&name, &pattern.pattern)?,
                    None => false,
                }
            }
            PatternKind::Regex => {
                let path_str = path.to_string_lossy().replace('\\', "/");
                match_regex(&path_str, &pattern.pattern)?
            }
        };

        self.cache.lock().unwrap().insert(key, result);
        Ok(result)
    }

    /// Filter `paths` down to those matching at least one pattern. An empty
    /// pattern list is treated as "no filtering" and returns `paths`
    /// unchanged rather than excluding everything.
    pub fn filter_files(
        &self,
        paths: &[PathBuf],
        patterns: &[PatternSpec],
    ) -> Result<Vec<PathBuf>, FilterError> {
        if patterns.is_empty() {
            return Ok(paths.to_vec());
        }

        let mut kept = Vec::with_capacity(paths.len());
        for path in paths {
            let mut include = false;
            for pattern in patterns {
                if self.matches(path, pattern)? {
                    include = true;
                    break;
                }
            }
            if include {
                kept.push(path.clone());
            }
        }
        Ok(kept)
    }

    /// Drop all cached match results.
    pub fn invalidate(&self) {
        self.cache.lock().unwrap().clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_patterns_keeps_everything() {
        let filter = FileFilter::new();
        let paths = vec![PathBuf::from("a.txt"), PathBuf::from("b.log")];
        let result = filter.filter_files(&paths, &[]).unwrap();
        assert_eq!(result, paths);
    }

    #[test]
    fn test_glob_matches_basename_only() {
        let filter = FileFilter::new();
        let pattern = PatternSpec::glob("*.log");
        assert!(filter
            .matches(Path::new("/var/data/app.log"), &pattern)
            .unwrap());
        assert!(!filter
            .matches(Path::new("/var/data/app.txt"), &pattern)
            .unwrap());
    }

    #[test]
    fn test_regex_matches_full_path() {
        let filter = FileFilter::new();
        let pattern = PatternSpec::regex(r"^/var/.*\.log$");
        assert!(filter
            .matches(Path::new("/var/data/app.log"), &pattern)
            .unwrap());
        assert!(!filter
            .matches(Path::new("/tmp/data/app.log"), &pattern)
            .unwrap());
    }

    #[test]
    fn test_filter_files_first_match_wins() {
        let filter = FileFilter::new();
        let paths = vec![
            PathBuf::from("keep.txt"),
            PathBuf::from("skip.bin"),
            PathBuf::from("also_keep.log"),
        ];
        let patterns = vec![PatternSpec::glob("*.txt"), PatternSpec::glob("*.log")];
        let result = filter.filter_files(&paths, &patterns).unwrap();
        assert_eq!(
            result,
            vec![PathBuf::from("keep.txt"), PathBuf::from("also_keep.log")]
        );
    }

    #[test]
    fn test_cache_is_populated_and_invalidated() {
        let filter = FileFilter::new();
        let pattern = PatternSpec::glob("*.log");
        filter.matches(Path::new("a.log"), &pattern).unwrap();
        assert_eq!(filter.cache_len(), 1);
        filter.invalidate();
        assert_eq!(filter.cache_len(), 0);
    }

    #[test]
    fn test_invalid_glob_errors() {
        let filter = FileFilter::new();
        let pattern = PatternSpec::glob("[invalid");
        assert!(filter.matches(Path::new("a.txt"), &pattern).is_err());
    }
}
