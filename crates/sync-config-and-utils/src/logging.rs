//! Logging initialization for the sync services.
//!
//! Thin wrapper over the observability crate. The output format is picked
//! from the environment so the same binary can log compactly in a terminal
//! and as JSONL when run unattended.

use observability::{LogConfig, LogFormat};

/// Initialize the logging system.
///
/// - `RUST_LOG` overrides `level` when set
/// - `ANCHORLINE_LOG_FORMAT=json` switches to JSONL output
/// - `ANCHORLINE_LOG_FILE` sets the JSONL destination (defaults to
///   `default_log_file` when JSON output is requested)
///
/// ```ignore
/// init_logging("info", paths.sync_log_file());
/// tracing::info!("sync service started");
/// ```
pub fn init_logging(level: &str, default_log_file: std::path::PathBuf) {
    let format = std::env::var("ANCHORLINE_LOG_FORMAT")
        .map(|raw| LogFormat::from_name(&raw))
        .unwrap_or_default();

    let log_path = match format {
        LogFormat::Json => Some(
            std::env::var("ANCHORLINE_LOG_FILE")
                .ok()
                .filter(|raw| !raw.trim().is_empty())
                .map(std::path::PathBuf::from)
                .unwrap_or(default_log_file),
        ),
        LogFormat::Compact => None,
    };

    observability::init_with_config(LogConfig {
        service_name: "anchorline-sync".into(),
        default_level: parse_level(level).as_str().to_ascii_lowercase(),
        format,
        log_path,
        also_stderr: format == LogFormat::Json,
    });
}

/// Parse a log level string into a tracing Level.
pub fn parse_level(level: &str) -> tracing::Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "info" => tracing::Level::INFO,
        "warn" | "warning" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    }
}
