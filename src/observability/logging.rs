//! Subscriber setup for the CLI and embedding services.
//!
//! Every poll runs inside a `next_steps` span carrying the host, infra-env
//! and status, so stdout and file output can be filtered per host. JSON
//! output flattens the span fields next to the event fields.

use std::path::PathBuf;

use tracing::{Level, Span, Subscriber};
use tracing_appender::{
    non_blocking::WorkerGuard,
    rolling::{RollingFileAppender, Rotation},
};
use tracing_log::LogTracer;
use tracing_subscriber::{
    fmt::{time::ChronoUtc, MakeWriter},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

use crate::{config::InstructionConfig, core::Host};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const CRATE_TARGET: &str = "host_instructions";
const LOG_FILE_PREFIX: &str = "host-instructions";

/// Output choices, normally derived from [`InstructionConfig`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    pub level: Level,
    pub json_format: bool,
    /// Daily-rotated log files are written here in addition to stderr
    pub log_dir: Option<String>,
    /// Extra `target=level` directives, e.g. `tokio=debug`
    pub extra_directives: Vec<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            json_format: false,
            log_dir: None,
            extra_directives: Vec::new(),
        }
    }
}

impl LoggingConfig {
    pub fn from_config(config: &InstructionConfig) -> Self {
        Self {
            level: config
                .log_level
                .as_deref()
                .map(parse_level)
                .unwrap_or(Level::INFO),
            json_format: config.log_json,
            log_dir: config.log_dir.clone().filter(|dir| !dir.is_empty()),
            extra_directives: Vec::new(),
        }
    }

    /// Filter used when `RUST_LOG` is unset: the crate at the configured
    /// level, followed by any extra directives.
    fn filter_directives(&self) -> String {
        std::iter::once(format!("{}={}", CRATE_TARGET, level_to_str(self.level)))
            .chain(self.extra_directives.iter().cloned())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Keeps the file appender's worker thread alive; drop it last.
#[derive(Debug)]
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Parse a level name, falling back to INFO.
pub fn parse_level(level: &str) -> Level {
    match level.to_ascii_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

const fn level_to_str(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Span wrapping one poll of a host.
pub fn host_span(host: &Host) -> Span {
    tracing::info_span!(
        "next_steps",
        host_id = %host.id,
        infra_env_id = %host.infra_env_id,
        status = %host.status,
    )
}

fn fmt_layer<S, W>(writer: W, ansi: bool, json: bool) -> Box<dyn Layer<S> + Send + Sync>
where
    S: Subscriber + for<'a> LookupSpan<'a> + 'static,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_ansi(ansi)
        .with_file(true)
        .with_line_number(true)
        .with_timer(ChronoUtc::new(TIME_FORMAT.to_string()))
        .with_writer(writer);
    if json {
        layer
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(false)
            .boxed()
    } else {
        layer.boxed()
    }
}

/// Install the global subscriber. A second call is a no-op.
///
/// An unusable log directory only disables the file output.
pub fn init_logging(config: LoggingConfig) -> LogGuard {
    let _ = LogTracer::init();

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter_directives()));

    let mut layers = vec![fmt_layer(std::io::stderr, !config.json_format, config.json_format)];

    let mut file_guard = None;
    if let Some(log_dir) = config.log_dir.as_deref().map(PathBuf::from) {
        match std::fs::create_dir_all(&log_dir) {
            Ok(()) => {
                let appender = RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                file_guard = Some(guard);
                layers.push(fmt_layer(non_blocking, false, config.json_format));
            }
            Err(e) => eprintln!("Log directory {} unusable: {}", log_dir.display(), e),
        }
    }

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init();

    LogGuard {
        _file_guard: file_guard,
    }
}
