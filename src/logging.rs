/*!
 * Logging and tracing initialization
 */

use std::fs::File;
use std::path::Path;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::error::{CollectorError, Result};

/// Initialize structured logging. `verbose` forces `DEBUG`; otherwise the
/// level comes from `RUST_LOG`, falling back to `INFO`. When `log_file` is
/// set, output is newline-delimited JSON to that file; otherwise compact
/// text to stdout.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let default_level = if verbose { Level::DEBUG } else { Level::INFO };

    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("collector={}", default_level)))
        .map_err(|e| CollectorError::Configuration(format!("failed to create log filter: {}", e)))?;

    match log_file {
        Some(path) => init_file_logging(path, env_filter),
        None => {
            init_stdout_logging(env_filter);
            Ok(())
        }
    }
}

fn init_stdout_logging(env_filter: EnvFilter) {
    let fmt_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
        .compact();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn init_file_logging(log_path: &Path, env_filter: EnvFilter) -> Result<()> {
    let file = File::create(log_path)
        .map_err(|e| CollectorError::Configuration(format!("failed to create log file: {}", e)))?;

    let fmt_layer = fmt::layer()
        .with_writer(file)
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(false)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    Ok(())
}

/// Test-only logging init: safe to call repeatedly, writes to the test
/// harness's captured output instead of stdout.
#[cfg(test)]
pub fn init_test_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("collector=debug"));

        let fmt_layer = fmt::layer().with_test_writer().with_target(false).compact();

        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .ok();
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_init_file_logging_creates_file() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("collector.log");
        // Can't call init_logging() itself (subscriber can only be
        // installed once per process); verify the file-creation step
        // the real init path depends on.
        File::create(&log_path).unwrap();
        assert!(log_path.exists());
    }
}
