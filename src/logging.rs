//! Logging initialization for crm-forms.
//!
//! Logs go to stderr by default, or to `<state>/logs/crm-forms-{datetime}.log`
//! when `logging.to_file` is set.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Keeps file logging alive; drop it to flush buffered lines
pub struct LoggingHandle {
    pub _guard: Option<WorkerGuard>,

    /// Log file in use, if logging to a file
    pub log_file_path: Option<PathBuf>,
}

/// Where log lines end up
struct Destination {
    writer: BoxMakeWriter,
    ansi: bool,
    handle: LoggingHandle,
}

/// Log level to use: `--debug` wins over the configured level
fn effective_level(config: &Config, debug_override: bool) -> String {
    if debug_override {
        "debug".to_string()
    } else {
        config.logging.level.clone()
    }
}

/// File name for a log started now
fn log_file_name() -> String {
    let timestamp = chrono::Utc::now().format("%Y%m%dT%H%M%SZ");
    format!("crm-forms-{timestamp}.log")
}

fn destination(config: &Config) -> Result<Destination> {
    if !config.logging.to_file {
        return Ok(Destination {
            writer: BoxMakeWriter::new(std::io::stderr),
            ansi: true,
            handle: LoggingHandle {
                _guard: None,
                log_file_path: None,
            },
        });
    }

    let logs_dir = config.logs_path();
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("Failed to create log directory {}", logs_dir.display()))?;

    let file_name = log_file_name();
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(&logs_dir, &file_name));

    Ok(Destination {
        writer: BoxMakeWriter::new(writer),
        ansi: false,
        handle: LoggingHandle {
            _guard: Some(guard),
            log_file_path: Some(logs_dir.join(file_name)),
        },
    })
}

/// Install the global subscriber.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_logging(config: &Config, debug_override: bool) -> Result<LoggingHandle> {
    let level = std::env::var("RUST_LOG").unwrap_or_else(|_| effective_level(config, debug_override));
    let Destination {
        writer,
        ansi,
        handle,
    } = destination(config)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(level))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_ansi(ansi)
                .with_writer(writer),
        )
        .init();

    Ok(handle)
}
