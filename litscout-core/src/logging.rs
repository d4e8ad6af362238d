//! Unified logging system
//!
//! Structured tracing output with configurable format and optional file target

use serde::{Deserialize, Serialize};
use std::io;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter,
};

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format (json, pretty, compact)
    pub format: LogFormat,
    /// Whether to log to file instead of stdout
    pub log_to_file: bool,
    /// Log file path (if log_to_file is true)
    pub log_file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Compact,
            log_to_file: false,
            log_file_path: None,
        }
    }
}

/// Initialize the logging system
pub fn init_logging(
    config: &LoggingConfig,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let registry = tracing_subscriber::registry().with(filter);

    let writer: Box<dyn io::Write + Send> = if config.log_to_file {
        let path = config
            .log_file_path
            .as_ref()
            .ok_or("log_file_path must be specified when log_to_file is true")?;
        Box::new(
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?,
        )
    } else {
        Box::new(io::stdout())
    };
    let writer = std::sync::Mutex::new(writer);

    match config.format {
        LogFormat::Json => {
            registry.with(fmt::layer().json().with_writer(writer)).init();
        }
        LogFormat::Pretty => {
            registry
                .with(fmt::layer().pretty().with_writer(writer))
                .init();
        }
        LogFormat::Compact => {
            registry
                .with(fmt::layer().compact().with_writer(writer))
                .init();
        }
    }

    Ok(())
}
