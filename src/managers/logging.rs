//! Logging manager with file rotation
//!
//! Three outputs:
//! - `rotator.log`: everything the crate logs except remote storage traffic
//! - `drive.log`: events logged with the `drive` target
//! - Console: INFO level on stderr, concise format
//!
//! Both files roll daily; the oldest files beyond `max_files` are removed
//! at startup.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// File name prefix of the storage/database stream
pub const ROTATOR_LOG_PREFIX: &str = "rotator.log";
/// File name prefix of the remote storage stream
pub const DRIVE_LOG_PREFIX: &str = "drive.log";
/// Tracing target routed to the remote storage stream
pub const DRIVE_TARGET: &str = "drive";

const CRATE_TARGET: &str = "mongo_drive_rotator";

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    /// Directory for log files
    pub log_directory: PathBuf,
    /// Level for both file outputs (console always uses INFO)
    pub log_level: Level,
    /// Maximum number of files to keep per stream
    pub max_files: u32,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("."),
            log_level: Level::INFO,
            max_files: 10,
        }
    }
}

impl LoggingConfig {
    /// Create from global config values
    pub fn from_config(log_directory: &Path, log_level: &str, max_files: u32) -> Self {
        Self {
            log_directory: log_directory.to_path_buf(),
            log_level: parse_level(log_level),
            max_files,
        }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Initialize logging with both file streams and the console
///
/// Returns a guard that must be kept alive for the duration of the program.
/// When the guard is dropped, any remaining logs are flushed to disk.
pub fn init_logging(config: &LoggingConfig) -> Result<LogGuard> {
    let log_dir = crate::config::expand_tilde(&config.log_directory);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("Failed to create log directory: {:?}", log_dir))?;

    let (rotator_writer, rotator_guard) = tracing_appender::non_blocking(RollingFileAppender::new(
        Rotation::DAILY,
        &log_dir,
        ROTATOR_LOG_PREFIX,
    ));
    let (drive_writer, drive_guard) = tracing_appender::non_blocking(RollingFileAppender::new(
        Rotation::DAILY,
        &log_dir,
        DRIVE_LOG_PREFIX,
    ));

    let rotator_layer = file_layer(rotator_writer)
        .with_filter(target_filter(CRATE_TARGET, config.log_level)?);

    let drive_layer = file_layer(drive_writer)
        .with_filter(target_filter(DRIVE_TARGET, config.log_level)?);

    // Console layer: INFO level, concise format
    let console_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(Level::INFO.to_string()));
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(true)
        .with_target(false)
        .with_level(true)
        .with_span_events(FmtSpan::NONE)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(rotator_layer)
        .with(drive_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install log subscriber")?;

    for prefix in [ROTATOR_LOG_PREFIX, DRIVE_LOG_PREFIX] {
        cleanup_old_logs(&log_dir, prefix, config.max_files)?;
    }

    Ok(LogGuard {
        _rotator_guard: rotator_guard,
        _drive_guard: drive_guard,
    })
}

/// File layer: no colors, target shown as the event source
fn file_layer<S, W>(writer: W) -> fmt::Layer<S, fmt::format::DefaultFields, fmt::format::Format, W>
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    W: for<'w> fmt::MakeWriter<'w> + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_level(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .with_span_events(FmtSpan::NONE)
}

/// Filter letting through one target at `level` and nothing else
fn target_filter(target: &str, level: Level) -> Result<EnvFilter> {
    EnvFilter::try_new(format!("{}={}", target, level))
        .with_context(|| format!("Invalid log filter for target '{}'", target))
}

/// Initialize simple console-only logging (for when config isn't available)
pub fn init_console_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_level(true)
        .try_init();
}

/// Remove the oldest files of one stream, keeping the newest `max_files`
fn cleanup_old_logs(log_dir: &Path, prefix: &str, max_files: u32) -> Result<()> {
    let mut log_files: Vec<_> = fs::read_dir(log_dir)
        .with_context(|| format!("Failed to read log directory {:?}", log_dir))?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .collect();

    // Newest first
    log_files.sort_by(|a, b| {
        let a_time = a.metadata().and_then(|m| m.modified()).ok();
        let b_time = b.metadata().and_then(|m| m.modified()).ok();
        b_time.cmp(&a_time)
    });

    for file in log_files.into_iter().skip(max_files as usize) {
        if let Err(e) = fs::remove_file(file.path()) {
            tracing::warn!("Failed to remove old log file {:?}: {}", file.path(), e);
        } else {
            tracing::debug!("Removed old log file: {:?}", file.path());
        }
    }

    Ok(())
}

/// Guard that keeps the logging system alive
///
/// When dropped, flushes any remaining logs to disk.
pub struct LogGuard {
    _rotator_guard: WorkerGuard,
    _drive_guard: WorkerGuard,
}
