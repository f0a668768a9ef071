//! Logging infrastructure for Locus.
//!
//! Provides structured logging with file output and optional console output:
//! - Writes to `logs/locus.log` (cleared on session start)
//! - Optionally mirrors to stdout for development
//! - Filter from `RUST_LOG`, falling back to the configured level

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "locus.log";

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Where and how much to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    /// Directory for the log file.
    pub directory: PathBuf,

    /// Log file name inside `directory`.
    pub file: String,

    /// Filter directive used when `RUST_LOG` is unset (e.g. "info", "locus=debug").
    pub level: String,

    /// Also print to stdout.
    pub stdout: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from(DEFAULT_LOG_DIR),
            file: DEFAULT_LOG_FILE.to_string(),
            level: DEFAULT_LOG_LEVEL.to_string(),
            stdout: true,
        }
    }
}

impl LogSettings {
    /// Full path of the log file.
    pub fn log_path(&self) -> PathBuf {
        self.directory.join(&self.file)
    }
}

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize logging.
///
/// Creates the log directory if needed, clears the previous log file, and
/// installs the global subscriber.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be prepared, the
/// configured level is not a valid filter, or a global subscriber is
/// already installed.
pub fn init_logging(settings: &LogSettings) -> Result<LoggingGuard, io::Error> {
    prepare_log_file(&settings.directory, &settings.file)?;

    let file_appender = tracing_appender::rolling::never(&settings.directory, &settings.file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    let stdout_layer = settings.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_ansi(true)
            .compact()
    });

    let env_filter = build_filter(&settings.level)?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(io::Error::other)?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Filter from `RUST_LOG`, or `default_level` when it is unset or invalid.
fn build_filter(default_level: &str) -> Result<EnvFilter, io::Error> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(default_level).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("invalid log level '{}': {}", default_level, e),
            )
        }),
    }
}

/// Create the directory and truncate the log file.
fn prepare_log_file(dir: &Path, file: &str) -> Result<PathBuf, io::Error> {
    fs::create_dir_all(dir)?;
    let log_path = dir.join(file);
    fs::write(&log_path, "")?;
    Ok(log_path)
}
