use crate::config::AppConfig;
use crate::error::GameLensError;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

const LOG_FILE_NAME: &str = "gamelens.log";

/// Initialize logging from application configuration
///
/// Console output on stderr plus an append-only
/// `gamelens.log` under `config.log_dir`.
/// `RUST_LOG` takes precedence over `config.log_level`.
pub fn setup_logging(config: &AppConfig) -> Result<(), GameLensError> {
    let (log_file, log_file_path) = open_log_file(&config.log_dir)?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter(&config.log_level));

    let file_layer = fmt::layer()
        .with_writer(log_file)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE)
        .with_filter(env_filter(&config.log_level));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| GameLensError::config(format!("Failed to install log subscriber: {}", e)))?;

    tracing::info!(
        "Logging initialized: level={}, log_file={}",
        parse_log_level(&config.log_level),
        log_file_path.display()
    );

    Ok(())
}

/// Console-only logging for development and tests
pub fn setup_console_logging(log_level: &str) -> Result<(), GameLensError> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_env_filter(env_filter(log_level))
        .try_init()
        .map_err(|e| GameLensError::config(format!("Failed to install log subscriber: {}", e)))?;

    tracing::info!("Console logging initialized: level={}", log_level);

    Ok(())
}

fn env_filter(log_level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(parse_log_level(log_level).as_str().to_lowercase()))
}

fn open_log_file(log_dir: &Path) -> Result<(File, PathBuf), GameLensError> {
    std::fs::create_dir_all(log_dir).map_err(|e| {
        GameLensError::config(format!(
            "Failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let path = log_dir.join(LOG_FILE_NAME);
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| {
            GameLensError::config(format!("Failed to open log file {}: {}", path.display(), e))
        })?;

    Ok((file, path))
}

/// Parse string to tracing Level, falling back to INFO
pub fn parse_log_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
