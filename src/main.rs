/*!
 * Collector CLI - pattern-filtered, parallel file collection
 */

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};

use collector::{
    ArchiveCompression, ArchiveFormat, CollectionConfig, CollectionService, CollectorError,
    Locale, OperationMode, PatternKind, PatternSpec,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum PatternTypeArg {
    Regex,
    Glob,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OperationModeArg {
    Copy,
    Move,
    MoveRemove,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ArchiveFormatArg {
    Zip,
    Tar,
    #[value(name = "7z")]
    SevenZ,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ArchiveCompressionArg {
    Gzip,
    Bzip2,
    Xz,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LocaleArg {
    Ru,
    En,
}

/// Universal file collector: filter source trees by pattern, copy/move the
/// matches into one target directory, optionally archiving the result.
#[derive(Parser, Debug)]
#[command(name = "collector", version, about)]
struct Cli {
    /// Source directories to collect files from (required unless --config supplies them)
    #[arg(long = "source-paths", num_args = 1..)]
    source_paths: Vec<PathBuf>,

    /// Target directory files are collected into (required unless --config supplies it)
    #[arg(long = "target-path")]
    target_path: Option<PathBuf>,

    /// Patterns used to filter collected files (glob or regex, per --pattern-type)
    #[arg(long = "patterns", num_args = 0..)]
    patterns: Vec<String>,

    /// How to interpret --patterns
    #[arg(long = "pattern-type", value_enum, default_value = "glob")]
    pattern_type: PatternTypeArg,

    /// How matched files are transferred
    #[arg(long = "operation-mode", value_enum, default_value = "copy")]
    operation_mode: OperationModeArg,

    /// Bundle the collected target directory into an archive afterwards
    #[arg(long = "create-archive")]
    create_archive: bool,

    /// Archive container format (used with --create-archive)
    #[arg(long = "archive-format", value_enum, default_value = "zip")]
    archive_format: ArchiveFormatArg,

    /// Archive compression (tar only)
    #[arg(long = "archive-compression", value_enum)]
    archive_compression: Option<ArchiveCompressionArg>,

    /// Collect a system diagnostics snapshot alongside the target
    #[arg(long = "collect-system-info", overrides_with = "no_collect_system_info")]
    collect_system_info: bool,

    /// Explicitly disable system info collection (default)
    #[arg(long = "no-collect-system-info", overrides_with = "collect_system_info")]
    no_collect_system_info: bool,

    /// Interface language for CLI messages
    #[arg(long, value_enum, default_value = "en")]
    locale: LocaleArg,

    /// Write an audit log of every operation and failure to this file
    #[arg(long = "audit-log-file")]
    audit_log_file: Option<PathBuf>,

    /// Disable audit logging entirely
    #[arg(long = "no-audit-logging")]
    no_audit_logging: bool,

    /// Write collector logs as JSON to this file instead of stdout
    #[arg(long = "log-file")]
    log_file: Option<PathBuf>,

    /// Load a saved TOML profile; CLI flags for unset fields fall back to it
    #[arg(long = "config")]
    config_file: Option<PathBuf>,

    /// Save the resolved configuration as a TOML profile for reuse, then exit
    #[arg(long = "save-config")]
    save_config: Option<PathBuf>,

    /// Verbose (debug-level) logging
    #[arg(short, long)]
    verbose: bool,
}

fn build_config(cli: &Cli) -> Result<CollectionConfig, CollectorError> {
    let base = match &cli.config_file {
        Some(path) => Some(collector::config::load_config_file(path)?),
        None => None,
    };

    let source_paths = if !cli.source_paths.is_empty() {
        cli.source_paths.clone()
    } else if let Some(base) = &base {
        base.source_paths.clone()
    } else {
        Vec::new()
    };

    let target_path = cli
        .target_path
        .clone()
        .or_else(|| base.as_ref().map(|b| b.target_path.clone()))
        .ok_or_else(|| CollectorError::Configuration("target_path is required".into()))?;

    let pattern_kind = match cli.pattern_type {
        PatternTypeArg::Regex => PatternKind::Regex,
        PatternTypeArg::Glob => PatternKind::Glob,
    };
    let patterns: Vec<PatternSpec> = if !cli.patterns.is_empty() {
        cli.patterns
            .iter()
            .map(|p| PatternSpec {
                pattern: p.clone(),
                pattern_type: pattern_kind,
            })
            .collect()
    } else if let Some(base) = &base {
        base.patterns.clone()
    } else {
        Vec::new()
    };

    let operation_mode = match cli.operation_mode {
        OperationModeArg::Copy => OperationMode::Copy,
        OperationModeArg::Move => OperationMode::Move,
        OperationModeArg::MoveRemove => OperationMode::MoveRemove,
    };

    let archive_format = match cli.archive_format {
        ArchiveFormatArg::Zip => ArchiveFormat::Zip,
        ArchiveFormatArg::Tar => ArchiveFormat::Tar,
        ArchiveFormatArg::SevenZ => ArchiveFormat::SevenZ,
    };
    let archive_compression = cli.archive_compression.map(|c| match c {
        ArchiveCompressionArg::Gzip => ArchiveCompression::Gzip,
        ArchiveCompressionArg::Bzip2 => ArchiveCompression::Bzip2,
        ArchiveCompressionArg::Xz => ArchiveCompression::Xz,
    });

    let locale = match cli.locale {
        LocaleArg::Ru => Locale::Ru,
        LocaleArg::En => Locale::En,
    };

    let mut builder = CollectionConfig::builder()
        .with_source_paths(source_paths)
        .with_target_path(target_path)
        .with_patterns(patterns)
        .with_operation_mode(operation_mode)
        .with_system_info(cli.collect_system_info)
        .with_audit_logging(!cli.no_audit_logging, cli.audit_log_file.clone())
        .with_locale(locale);

    if cli.create_archive {
        builder = builder.with_archive(archive_format, archive_compression);
    }

    builder.build()
}

/// Exit code for a given error. Validation, path/security, and operation
/// failures all exit 1 per the CLI surface; anything uncaught reaching
/// `main` still exits non-zero via `std::process::exit(1)`.
fn exit_code_for(_error: &CollectorError) -> i32 {
    1
}

fn run(cli: &Cli) -> Result<(), CollectorError> {
    let config = build_config(cli)?;

    if let Some(save_path) = &cli.save_config {
        collector::config::save_config_file(&config, save_path)?;
        println!("config saved to {}", save_path.display());
        return Ok(());
    }

    let service = CollectionService::new(config)?;
    let tracker = service.progress_tracker();

    let bar = Arc::new(ProgressBar::new(0));
    if let Ok(style) =
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} ({percent}%) {msg}")
    {
        bar.set_style(style);
    }
    let bar_for_cb = Arc::clone(&bar);
    tracker.subscribe(Box::new(move |_percentage, current, total, current_file| {
        bar_for_cb.set_length(total);
        bar_for_cb.set_position(current);
        if let Some(file) = current_file {
            bar_for_cb.set_message(file.to_string());
        }
    }));

    let result = service.collect()?;
    bar.finish_and_clear();

    println!(
        "total={} processed={} failed={} target={}",
        result.total_files,
        result.processed_files,
        result.failed_files,
        result.target_path.display()
    );
    if result.pc_info_collected {
        if let Some(path) = &result.pc_info_path {
            println!("pc_info={}", path.display());
        }
    }
    if result.archive_created {
        if let Some(path) = &result.archive_path {
            println!("archive={}", path.display());
        }
    } else if let Some(err) = &result.archive_error {
        println!("archive_error={}", err);
    }

    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let locale = match cli.locale {
        LocaleArg::Ru => Locale::Ru,
        LocaleArg::En => Locale::En,
    };

    if let Err(e) = collector::logging::init_logging(cli.verbose, cli.log_file.as_deref()) {
        eprintln!("{}", collector::locale::error_message(&e, locale));
        std::process::exit(exit_code_for(&e));
    }

    match run(&cli) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("{}", collector::locale::error_message(&e, locale));
            std::process::exit(exit_code_for(&e));
        }
    }
}
