/*!
 * Collector - parallel, pattern-filtered file collection
 *
 * Collects files from one or more source trees, filters them by glob or
 * regex pattern, and transfers the matches (copy, move, or move-then-
 * remove) into a target directory, preserving their relative layout under
 * a common base. Transfers run across a bounded pool of worker threads;
 * progress is reported through a low-contention tracker that subscribers
 * (CLI, GUI, or an HTTP/WebSocket control plane) can poll or subscribe to.
 *
 * # Scope
 *
 * This crate is the collection engine: path sanitization, pattern
 * filtering, the worker pool, the progress tracker, the file-operation
 * strategies, and the service that orchestrates them into one job. It
 * ships reference implementations of the archive writer ([`archive`]) and
 * system-info reporter ([`pc_info`]) collaborators, since both cost little
 * and the bundled CLI needs them, but treats an HTTP/WebSocket control
 * plane, a GUI, email dispatch, and persisted history/config stores as
 * external collaborators this crate does not implement.
 *
 * [`core::CollectionService::collect`] is synchronous and blocking; an
 * async caller (e.g. an `axum` handler backing the HTTP surface below)
 * must run it on a blocking thread (`tokio::task::spawn_blocking`) rather
 * than call it directly from an async task.
 *
 * ## HTTP/WebSocket contract (external collaborator, not implemented here)
 *
 * - `POST /api/v1/collect` — body: a `CollectionConfig` JSON document.
 *   Response `{job_id, status: "started"}`.
 * - `GET /api/v1/progress/{job_id}` — `{job_id, percentage, current,
 *   total, current_file?}`; 404 if unknown.
 * - `GET /api/v1/result/{job_id}` — `{job_id, status, results}`; 202 while
 *   running, 404 if unknown. `status ∈ {completed, failed, cancelled,
 *   pending}`.
 * - `DELETE /api/v1/job/{job_id}` — cancel and delete; 404 if unknown.
 * - `GET /api/v1/jobs`, `/status/{id}`, `/health`, `/metrics`.
 * - `WebSocket /api/v1/ws/progress/{job_id}` — pushes a progress record on
 *   each flush notification; replies to `{"type":"ping"}` with
 *   `{"type":"pong"}`.
 * - Rate limit: 100 requests / 60s / client IP, 429 on excess. Max request
 *   body 10 MiB, 413 on excess.
 * - Error mapping: validation → 422; security/path → 400; unknown job →
 *   404; still running → 202; rate/size → 429/413.
 */

pub mod archive;
pub mod audit;
pub mod config;
pub mod core;
pub mod error;
pub mod locale;
pub mod logging;
pub mod pc_info;
pub mod security;

pub use archive::{ArchiveWriter, LocalArchiveWriter};
pub use config::{
    ArchiveCompression, ArchiveFormat, CollectionConfig, CollectionConfigBuilder, Locale,
    OperationMode, PatternKind, PatternSpec,
};
pub use core::{CollectionResult, CollectionService};
pub use error::{CollectorError, ErrorCategory, Result};
pub use pc_info::{PcInfoFormat, PcInfoProfile, PcInfoReporter};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
