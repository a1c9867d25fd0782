//! # Observability
//!
//! Centralized tracing setup for the Anchorline sync services.
//!
//! Services call [`init`] or [`init_with_config`] once at startup and then
//! use the regular `tracing` macros. Where the output goes is decided here:
//!
//! - **Compact** (default): human-readable lines on stderr.
//! - **Json**: one JSON object per line, appended to `log_path`, so a sync
//!   session can be replayed later with `jq` or `lnav`.
//!
//! ```rust,ignore
//! observability::init_with_config(observability::LogConfig {
//!     service_name: "anchorline-sync".into(),
//!     default_level: "debug".into(),
//!     format: observability::LogFormat::Json,
//!     log_path: Some("/tmp/sync.jsonl".into()),
//!     ..Default::default()
//! });
//! ```

mod file;
mod json_layer;

use std::path::PathBuf;

pub use file::LogFileWriter;
pub use json_layer::{JsonLayer, JsonLine};

/// Output format for log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Compact human-readable lines on stderr.
    Compact,
    /// Structured JSONL written to a file.
    Json,
}

impl Default for LogFormat {
    fn default() -> Self {
        Self::Compact
    }
}

impl LogFormat {
    /// Parse a format name, falling back to compact output.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" | "jsonl" => Self::Json,
            _ => Self::Compact,
        }
    }
}

/// Configuration for the logging system.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Name of the service, written into every JSON line.
    pub service_name: String,

    /// Default filter (e.g. "info", "sync_queue_engine=debug").
    /// `RUST_LOG` takes precedence when set.
    pub default_level: String,

    /// Output format.
    pub format: LogFormat,

    /// Target file for [`LogFormat::Json`]. Ignored for compact output.
    pub log_path: Option<PathBuf>,

    /// Mirror JSON output to stderr in compact form.
    pub also_stderr: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            service_name: "unknown".into(),
            default_level: "info".into(),
            format: LogFormat::Compact,
            log_path: None,
            also_stderr: false,
        }
    }
}

/// Initialize compact stderr logging for a service.
pub fn init(service_name: &str) {
    init_with_config(LogConfig {
        service_name: service_name.into(),
        ..Default::default()
    });
}

/// Initialize the global subscriber from `config`.
///
/// Calling this more than once is harmless: later calls are ignored, which
/// keeps tests that each initialize logging from fighting over the global
/// dispatcher. If the JSON log file cannot be opened, logging falls back to
/// compact stderr output.
pub fn init_with_config(config: LogConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::Layer;

    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.default_level))
    };

    let json_target = match (config.format, config.log_path.as_ref()) {
        (LogFormat::Json, Some(path)) => match LogFileWriter::open(path) {
            Ok(writer) => Some((path.clone(), writer)),
            Err(err) => {
                eprintln!("failed to open log file {}: {err}", path.display());
                None
            }
        },
        _ => None,
    };

    let Some((path, writer)) = json_target else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter())
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .try_init();
        return;
    };

    let json_layer = JsonLayer::new(config.service_name.clone(), writer).with_filter(filter());
    let stderr_layer = config.also_stderr.then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .compact()
            .with_filter(filter())
    });

    if tracing_subscriber::registry()
        .with(json_layer)
        .with(stderr_layer)
        .try_init()
        .is_ok()
    {
        tracing::info!(log_path = %path.display(), "observability initialized");
    }
}

/// Re-export tracing macros so services can use `observability::info!()`.
pub use tracing::{debug, error, info, instrument, trace, warn};
