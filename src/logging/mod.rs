//! Structured logging for the validator sentinel
//!
//! Console output plus a daily-rotated JSON log file.
//! Logs are written to: `<config dir>/validator-sentinel/logs/`

pub mod macros;

use std::path::PathBuf;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const APP_DIR: &str = "validator-sentinel";
const LOG_FILE_PREFIX: &str = "sentinel.log";

/// Initialize the logging system
///
/// Set `RUST_LOG` to control the level (defaults to `info`), e.g.
/// `RUST_LOG=validator_sentinel=debug`.
pub fn init_logging() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let log_dir = get_log_directory()?;
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, LOG_FILE_PREFIX);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_line_number(true)
        .compact();

    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .json();

    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("info"))?;

    let init_result = tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();

    if let Err(e) = init_result {
        // A test harness or embedding host may already own the global subscriber.
        if e.to_string().contains("already been set") {
            return Ok(log_dir);
        }
        return Err(Box::new(e));
    }

    tracing::info!("Logging initialized. Log directory: {}", log_dir.display());

    Ok(log_dir)
}

/// Returns `~/.config/validator-sentinel/logs` (platform equivalent elsewhere)
fn get_log_directory() -> Result<PathBuf, Box<dyn std::error::Error>> {
    let base_dir = if cfg!(target_os = "windows") {
        dirs::data_local_dir().ok_or("Could not find APPDATA directory")?
    } else {
        dirs::config_dir().ok_or("Could not find config directory")?
    };

    Ok(base_dir.join(APP_DIR).join("logs"))
}
