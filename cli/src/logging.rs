use std::sync::OnceLock;

use tracing::{Level, Subscriber};
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use crate::config::{runtime_dir, LogLevel, LogOutput};

static INIT: OnceLock<()> = OnceLock::new();

const LOG_FILE_PREFIX: &str = "carbon-track";
const MAX_LOG_FILES: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    File,
    Stderr,
    Both,
}

impl From<LogOutput> for LogMode {
    fn from(output: LogOutput) -> Self {
        match output {
            LogOutput::Stderr => LogMode::Stderr,
            LogOutput::File => LogMode::File,
            LogOutput::Both => LogMode::Both,
        }
    }
}

pub struct LogGuard {
    _guard: Option<WorkerGuard>,
}

/// The `--log-level` flag wins over the config file. `None` disables logging.
pub fn effective_level(configured: LogLevel, cli_override: Option<LogLevel>) -> Option<Level> {
    cli_override.unwrap_or(configured).as_tracing_level()
}

/// Installs the global subscriber once; later calls are no-ops.
pub fn init(level: LogLevel, mode: LogMode, cli_override: Option<LogLevel>) -> LogGuard {
    let mut guard = None;

    INIT.get_or_init(|| {
        let Some(level) = effective_level(level, cli_override) else {
            return;
        };

        let writer = match mode {
            LogMode::Stderr => None,
            LogMode::File | LogMode::Both => file_writer(),
        };

        guard = match (mode, writer) {
            (LogMode::Stderr, _) | (_, None) => {
                tracing_subscriber::registry()
                    .with(stderr_layer().with_filter(build_env_filter(level)))
                    .init();
                None
            }
            (LogMode::File, Some((writer, worker))) => {
                tracing_subscriber::registry()
                    .with(file_layer(writer).with_filter(build_env_filter(level)))
                    .init();
                Some(worker)
            }
            (LogMode::Both, Some((writer, worker))) => {
                tracing_subscriber::registry()
                    .with(file_layer(writer).with_filter(build_env_filter(level)))
                    .with(stderr_layer().with_filter(build_env_filter(level)))
                    .init();
                Some(worker)
            }
        };
    });

    LogGuard { _guard: guard }
}

fn build_env_filter(level: Level) -> EnvFilter {
    EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy()
}

fn stderr_layer<S>() -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(std::io::stderr)
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(true)
        .with_target(true)
}

fn file_layer<S>(writer: NonBlocking) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(writer)
        .with_timer(UtcTime::rfc_3339())
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
}

/// Opens the daily rolling log in the runtime dir. `None` means file logging
/// is unavailable and stderr is used instead.
fn file_writer() -> Option<(NonBlocking, WorkerGuard)> {
    let log_dir = runtime_dir();

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        eprintln!(
            "Warning: Failed to create log directory {:?}: {}",
            log_dir, e
        );
        return None;
    }

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix("log")
        .max_log_files(MAX_LOG_FILES)
        .build(&log_dir)
        .ok()?;

    Some(tracing_appender::non_blocking(appender))
}
