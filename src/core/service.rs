/*!
 * Collection Service: the orchestrator that turns a `CollectionConfig`
 * into an executed job. Owns the filter, tracker, worker pool, and file
 * operations for one `collect()` call; ties discovery, filtering,
 * common-base computation, dispatch, and result assembly together.
 *
 * Grounded on `original_source/src/core/collection_service.py`
 * (`_collect_all_files`, `_find_common_base`, `CollectionService.collect`).
 */

use std::path::{Path, PathBuf};
use std::sync::Arc;

use walkdir::WalkDir;

use crate::archive::{self, ArchiveWriter, LocalArchiveWriter};
use crate::audit::{AuditSink, FileAuditSink};
use crate::config::CollectionConfig;
use crate::core::filter::FileFilter;
use crate::core::operations::FileOperations;
use crate::core::progress::ProgressTracker;
use crate::core::validator;
use crate::core::worker_pool::{CancellationToken, WorkerPool};
use crate::error::{CollectorError, Result};
use crate::pc_info::{PcInfoFormat, PcInfoProfile, PcInfoReporter, SystemInfoCollector};

/// Outcome of one `collect()` call. `processed_files + failed_files ==
/// total_files` whenever `total_files > 0` and the run was not cancelled
/// (spec §3 invariant); a cancelled run can leave files in neither bucket
/// because the worker pool never attempted them. `processed_files` is
/// derived from files the tracker actually saw, not from `total -
/// failed`, so an untouched file is neither counted as processed nor as
/// failed.
#[derive(Debug, Clone)]
pub struct CollectionResult {
    pub total_files: u64,
    pub processed_files: u64,
    pub failed_files: u64,
    pub target_path: PathBuf,
    pub pc_info_collected: bool,
    pub pc_info_path: Option<PathBuf>,
    pub archive_created: bool,
    pub archive_path: Option<PathBuf>,
    pub archive_error: Option<String>,
}

impl CollectionResult {
    fn empty(target_path: PathBuf) -> Self {
        Self {
            total_files: 0,
            processed_files: 0,
            failed_files: 0,
            target_path,
            pc_info_collected: false,
            pc_info_path: None,
            archive_created: false,
            archive_path: None,
            archive_error: None,
        }
    }
}

/// Resolves symlinks and relativizes to an absolute path, matching the
/// source's `filepath.resolve()` so later `strip_prefix` against a
/// similarly-resolved `source_base` lines up.
fn resolve(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn collect_all_files(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for source in paths {
        if source.is_file() {
            files.push(resolve(source));
        } else if source.is_dir() {
            for entry in WalkDir::new(source).into_iter().filter_map(|e| e.ok()) {
                if entry.file_type().is_file() {
                    files.push(resolve(entry.path()));
                }
            }
        }
    }
    files
}

/// The deepest ancestor shared by the first ten kept files and the
/// declared source roots. Mirrors `_find_common_base` exactly: single
/// source is always its own base (its parent if it names a file); with
/// multiple sources, the first source's directory wins (matching the
/// source implementation's fallback, which never actually computes an
/// intersection from `common_parts` — it's assigned but unused upstream).
fn find_common_base(source_paths: &[PathBuf]) -> PathBuf {
    let resolved: Vec<PathBuf> = source_paths
        .iter()
        .map(|p| p.canonicalize().unwrap_or_else(|_| p.clone()))
        .collect();

    if resolved.len() == 1 {
        let base = &resolved[0];
        return if base.is_file() {
            base.parent().unwrap_or(base).to_path_buf()
        } else {
            base.clone()
        };
    }

    let first = &resolved[0];
    if first.is_file() {
        first.parent().unwrap_or(first).to_path_buf()
    } else {
        first.clone()
    }
}

/// Orchestrates one collection run. Exclusively owns the tracker, worker
/// pool, filter, and file operations for the duration of `collect()`.
pub struct CollectionService {
    config: CollectionConfig,
    tracker: ProgressTracker,
    filter: FileFilter,
    cancellation: CancellationToken,
    archive_writer: Arc<dyn ArchiveWriter>,
    pc_info_reporter: Arc<dyn PcInfoReporter>,
}

impl CollectionService {
    pub fn new(config: CollectionConfig) -> Result<Self> {
        validator::validate(&config)?;
        Ok(Self {
            config,
            tracker: ProgressTracker::new(),
            filter: FileFilter::new(),
            cancellation: CancellationToken::new(),
            archive_writer: Arc::new(LocalArchiveWriter),
            pc_info_reporter: Arc::new(SystemInfoCollector::new(PcInfoProfile::safe_default())),
        })
    }

    /// Swap in a different archive backend (e.g. one that streams to
    /// object storage instead of writing a local file).
    pub fn with_archive_writer(mut self, writer: Arc<dyn ArchiveWriter>) -> Self {
        self.archive_writer = writer;
        self
    }

    pub fn with_pc_info_reporter(mut self, reporter: Arc<dyn PcInfoReporter>) -> Self {
        self.pc_info_reporter = reporter;
        self
    }

    /// Shared handle to the tracker so a caller can subscribe before
    /// calling [`Self::collect`] (the CLI and an HTTP layer both need
    /// this to stream progress as the job runs).
    pub fn progress_tracker(&self) -> ProgressTracker {
        self.tracker.clone()
    }

    /// Shared handle that can cancel an in-flight [`Self::collect`] from
    /// another thread (the CLI's Ctrl-C handler and a future HTTP cancel
    /// endpoint both need this). Must be obtained before `collect()` is
    /// called on whatever thread is running it.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    pub fn collect(&self) -> Result<CollectionResult> {
        let all_files = collect_all_files(&self.config.source_paths);

        let filtered_files = self.filter.filter_files(&all_files, &self.config.patterns)?;

        if filtered_files.is_empty() {
            return Ok(CollectionResult::empty(self.config.target_path.clone()));
        }

        let source_base = find_common_base(&self.config.source_paths);
        let target_base = self
            .config
            .target_path
            .canonicalize()
            .unwrap_or_else(|_| self.config.target_path.clone());
        std::fs::create_dir_all(&target_base).map_err(|e| {
            CollectorError::PathError(format!(
                "failed to create target directory {}: {}",
                target_base.display(),
                e
            ))
        })?;

        let audit_sink: Option<Box<dyn AuditSink>> = if self.config.enable_audit_logging {
            Some(Box::new(FileAuditSink::new(
                self.config.audit_log_file.as_deref(),
            )?))
        } else {
            None
        };

        let mut operations = FileOperations::new(self.config.operation_mode);
        if let Some(sink) = audit_sink {
            operations = operations.with_audit_sink(sink);
        }
        let operations = Arc::new(operations);

        let mut pool = WorkerPool::with_cancellation(self.cancellation.clone());
        let failed = pool.execute(
            filtered_files.clone(),
            &source_base,
            &target_base,
            self.tracker.clone(),
            operations,
        )?;

        let total = filtered_files.len() as u64;
        // `attempted` excludes files a cancelled run never got to; deriving
        // `processed` from `total - failed` instead would count those
        // untouched files as successfully processed.
        let attempted = self.tracker.get_current(true);
        let processed = attempted.saturating_sub(failed);

        let mut result = CollectionResult {
            total_files: total,
            processed_files: processed,
            failed_files: failed,
            target_path: target_base.clone(),
            pc_info_collected: false,
            pc_info_path: None,
            archive_created: false,
            archive_path: None,
            archive_error: None,
        };

        if self.config.collect_system_info {
            let pc_info_path = target_base.join("pc_info.json");
            match self.pc_info_reporter.save(&pc_info_path, PcInfoFormat::Json) {
                Ok(()) => {
                    result.pc_info_collected = true;
                    result.pc_info_path = Some(pc_info_path);
                }
                Err(e) => {
                    tracing::warn!("pc-info collection failed: {}", e);
                    result.pc_info_collected = false;
                }
            }
        }

        if self.config.create_archive {
            let archive_path = archive::archive_path_for(
                &target_base,
                self.config.archive_format,
                self.config.archive_compression,
            );
            match self.archive_writer.write_archive(
                &target_base,
                &archive_path,
                self.config.archive_format,
                self.config.archive_compression,
                None,
            ) {
                Ok(()) => {
                    result.archive_created = true;
                    result.archive_path = Some(archive_path);
                }
                Err(e) => {
                    result.archive_created = false;
                    result.archive_error = Some(e.to_string());
                }
            }
        }

        Ok(result)
    }
}
