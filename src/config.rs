/*!
 * Configuration structures for the collection service
 */

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{CollectorError, Result};
use crate::security::{MAX_PATH_LENGTH, MAX_PATTERN_LENGTH, MAX_SOURCE_PATHS};

/// How a file operation should be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationMode {
    /// Copy files, leaving the source untouched.
    Copy,
    /// Move files via rename (falling back to copy+delete across filesystems).
    Move,
    /// Move files, then remove the source explicitly if it still exists.
    MoveRemove,
}

impl Default for OperationMode {
    fn default() -> Self {
        Self::Copy
    }
}

/// Archive container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveFormat {
    Zip,
    Tar,
    SevenZ,
}

impl Default for ArchiveFormat {
    fn default() -> Self {
        Self::Zip
    }
}

/// Compression applied on top of an archive format (tar only; zip carries
/// its own deflate, 7z carries its own LZMA).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveCompression {
    Gzip,
    Bzip2,
    Xz,
}

/// A single include/exclude pattern.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatternSpec {
    pub pattern: String,
    #[serde(default = "default_pattern_kind")]
    pub pattern_type: PatternKind,
}

fn default_pattern_kind() -> PatternKind {
    PatternKind::Glob
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    Glob,
    Regex,
}

impl PatternSpec {
    pub fn glob(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            pattern_type: PatternKind::Glob,
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            pattern_type: PatternKind::Regex,
        }
    }
}

/// Locale used for CLI-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    En,
    Ru,
}

impl Default for Locale {
    fn default() -> Self {
        Self::En
    }
}

/// Full configuration for a single collection run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub source_paths: Vec<PathBuf>,
    pub target_path: PathBuf,
    #[serde(default)]
    pub patterns: Vec<PatternSpec>,
    #[serde(default)]
    pub operation_mode: OperationMode,
    #[serde(default)]
    pub create_archive: bool,
    #[serde(default)]
    pub archive_format: ArchiveFormat,
    #[serde(default)]
    pub archive_compression: Option<ArchiveCompression>,
    #[serde(default)]
    pub collect_system_info: bool,
    #[serde(default = "default_true")]
    pub enable_audit_logging: bool,
    #[serde(default)]
    pub audit_log_file: Option<PathBuf>,
    #[serde(default)]
    pub locale: Locale,
}

fn default_true() -> bool {
    true
}

impl CollectionConfig {
    pub fn builder() -> CollectionConfigBuilder {
        CollectionConfigBuilder::default()
    }
}

/// Fluent builder mirroring the Python `CollectionConfigBuilder`.
#[derive(Debug, Default)]
pub struct CollectionConfigBuilder {
    source_paths: Vec<PathBuf>,
    target_path: Option<PathBuf>,
    patterns: Vec<PatternSpec>,
    operation_mode: OperationMode,
    create_archive: bool,
    archive_format: ArchiveFormat,
    archive_compression: Option<ArchiveCompression>,
    collect_system_info: bool,
    enable_audit_logging: bool,
    audit_log_file: Option<PathBuf>,
    locale: Locale,
}

impl CollectionConfigBuilder {
    pub fn with_source_paths(mut self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        self.source_paths = paths.into_iter().collect();
        self
    }

    pub fn with_target_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.target_path = Some(path.into());
        self
    }

    pub fn with_patterns(mut self, patterns: impl IntoIterator<Item = PatternSpec>) -> Self {
        self.patterns = patterns.into_iter().collect();
        self
    }

    pub fn with_operation_mode(mut self, mode: OperationMode) -> Self {
        self.operation_mode = mode;
        self
    }

    pub fn with_archive(mut self, format: ArchiveFormat, compression: Option<ArchiveCompression>) -> Self {
        self.create_archive = true;
        self.archive_format = format;
        self.archive_compression = compression;
        self
    }

    pub fn with_system_info(mut self, collect: bool) -> Self {
        self.collect_system_info = collect;
        self
    }

    pub fn with_audit_logging(mut self, enabled: bool, log_file: Option<PathBuf>) -> Self {
        self.enable_audit_logging = enabled;
        self.audit_log_file = log_file;
        self
    }

    pub fn with_locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    pub fn build(self) -> Result<CollectionConfig> {
        let target_path = self
            .target_path
            .ok_or_else(|| CollectorError::Configuration("target_path is required".into()))?;

        Ok(CollectionConfig {
            source_paths: self.source_paths,
            target_path,
            patterns: self.patterns,
            operation_mode: self.operation_mode,
            create_archive: self.create_archive,
            archive_format: self.archive_format,
            archive_compression: self.archive_compression,
            collect_system_info: self.collect_system_info,
            enable_audit_logging: self.enable_audit_logging,
            audit_log_file: self.audit_log_file,
            locale: self.locale,
        })
    }
}

/// Load a `CollectionConfig` from a TOML file, letting a saved profile
/// stand in for (or seed) CLI flags.
pub fn load_config_file(path: &Path) -> Result<CollectionConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        CollectorError::Configuration(format!("failed to read config file {}: {}", path.display(), e))
    })?;
    toml::from_str(&contents)
        .map_err(|e| CollectorError::Configuration(format!("invalid config file {}: {}", path.display(), e)))
}

/// Save a `CollectionConfig` to a TOML file, e.g. for reuse via `--config`.
pub fn save_config_file(config: &CollectionConfig, path: &Path) -> Result<()> {
    let contents = toml::to_string_pretty(config)
        .map_err(|e| CollectorError::Configuration(format!("failed to serialize config: {}", e)))?;
    std::fs::write(path, contents).map_err(|e| {
        CollectorError::Configuration(format!("failed to write config file {}: {}", path.display(), e))
    })
}

/// Structural validation of a `CollectionConfig`; does not touch the
/// filesystem beyond existence/type checks. See [`crate::core::validator`]
/// for the full pre-flight checks including disk space and ReDoS patterns.
pub fn validate_structure(config: &CollectionConfig) -> Result<()> {
    if config.source_paths.is_empty() {
        return Err(CollectorError::Validation(
            "source_paths must not be empty".into(),
        ));
    }
    if config.source_paths.len() > MAX_SOURCE_PATHS {
        return Err(CollectorError::Validation(format!(
            "source_paths exceeds maximum of {}",
            MAX_SOURCE_PATHS
        )));
    }
    for source in &config.source_paths {
        if source.to_string_lossy().len() > MAX_PATH_LENGTH {
            return Err(CollectorError::Validation(format!(
                "source path exceeds maximum length: {}",
                source.display()
            )));
        }
    }
    if config.target_path.to_string_lossy().len() > MAX_PATH_LENGTH {
        return Err(CollectorError::Validation(
            "target_path exceeds maximum length".into(),
        ));
    }
    for pattern in &config.patterns {
        if pattern.pattern.len() > MAX_PATTERN_LENGTH {
            return Err(CollectorError::Validation(format!(
                "pattern exceeds maximum length: {}",
                pattern.pattern
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_requires_target() {
        let result = CollectionConfig::builder()
            .with_source_paths(vec![PathBuf::from("/tmp/src")])
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_defaults() {
        let config = CollectionConfig::builder()
            .with_source_paths(vec![PathBuf::from("/tmp/src")])
            .with_target_path("/tmp/dst")
            .build()
            .unwrap();
        assert_eq!(config.operation_mode, OperationMode::Copy);
        assert_eq!(config.archive_format, ArchiveFormat::Zip);
        assert!(!config.create_archive);
        assert!(config.enable_audit_logging);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profile.toml");
        let config = CollectionConfig::builder()
            .with_source_paths(vec![PathBuf::from("/tmp/src")])
            .with_target_path("/tmp/dst")
            .with_patterns(vec![PatternSpec::glob("*.log")])
            .build()
            .unwrap();

        save_config_file(&config, &path).unwrap();
        let loaded = load_config_file(&path).unwrap();

        assert_eq!(loaded.source_paths, config.source_paths);
        assert_eq!(loaded.target_path, config.target_path);
        assert_eq!(loaded.patterns.len(), 1);
    }

    #[test]
    fn test_load_config_file_missing() {
        let result = load_config_file(Path::new("/nonexistent/profile.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_rejects_empty_sources() {
        let config = CollectionConfig {
            source_paths: vec![],
            target_path: PathBuf::from("/tmp/dst"),
            patterns: vec![],
            operation_mode: OperationMode::Copy,
            create_archive: false,
            archive_format: ArchiveFormat::Zip,
            archive_compression: None,
            collect_system_info: false,
            enable_audit_logging: true,
            audit_log_file: None,
            locale: Locale::En,
        };
        assert!(validate_structure(&config).is_err());
    }
}
