//! Structured logging setup.
//!
//! Pretty output for interactive use, JSON for automation, optional file
//! output with daily rotation. Filtering is controlled through the standard
//! `RUST_LOG` environment variable and defaults to `info`.

use anyhow::Result;
use std::env;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt,
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output for terminals.
    Pretty,
    /// JSON structured logging for automation pipelines.
    Json,
}

/// Log output destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    Stderr,
    /// Daily-rotated file under [`LoggingConfig::log_dir`].
    File,
}

/// Configuration for logging setup.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub output: LogOutput,
    pub log_dir: PathBuf,
    pub log_file_prefix: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            output: LogOutput::Stderr,
            log_dir: PathBuf::from("logs"),
            log_file_prefix: "entigen".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Build a configuration from `LOG_FORMAT`, `LOG_OUTPUT` and `LOG_DIR`.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(format) = env::var("LOG_FORMAT") {
            config.format = match format.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                "pretty" => LogFormat::Pretty,
                _ => config.format,
            };
        }

        if let Ok(output) = env::var("LOG_OUTPUT") {
            config.output = match output.to_lowercase().as_str() {
                "file" => LogOutput::File,
                "stderr" => LogOutput::Stderr,
                _ => config.output,
            };
        }

        if let Ok(log_dir) = env::var("LOG_DIR") {
            config.log_dir = PathBuf::from(log_dir);
        }

        config
    }
}

/// Initialize the global tracing subscriber.
///
/// Returns a worker guard that must be held for the lifetime of the process
/// when file output is active, otherwise buffered lines are lost on exit.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let (layer, guard) = match config.output {
        LogOutput::Stderr => {
            let layer = match config.format {
                LogFormat::Json => fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .boxed(),
                LogFormat::Pretty => fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false)
                    .boxed(),
            };
            (layer, None)
        }
        LogOutput::File => {
            let appender =
                tracing_appender::rolling::daily(&config.log_dir, &config.log_file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = match config.format {
                LogFormat::Json => fmt::layer().json().with_writer(writer).boxed(),
                LogFormat::Pretty => fmt::layer()
                    .with_ansi(false)
                    .with_writer(writer)
                    .boxed(),
            };
            (layer, Some(guard))
        }
    };

    tracing_subscriber::registry().with(filter).with(layer).init();

    Ok(guard)
}
