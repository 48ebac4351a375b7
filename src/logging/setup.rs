use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use super::formatter::BracketedFormatter;
use crate::error::{GuidanceError, GuidanceResult};

/// Install the global subscriber writing to stdout and to a timestamped file
/// under `log_dir`.
///
/// # Returns
/// * `Ok(PathBuf)` with the path of the created log file
/// * `Err(GuidanceError::Io)` if the directory or file cannot be created
pub fn setup_logging(log_dir: &Path) -> GuidanceResult<PathBuf> {
    fs::create_dir_all(log_dir).map_err(|e| GuidanceError::io(log_dir, e))?;

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("frame_guidance_{}.log", timestamp);
    let log_path = log_dir.join(&log_filename);

    let file = fs::OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&log_path)
        .map_err(|e| GuidanceError::io(&log_path, e))?;

    let file_layer = fmt::layer()
        .event_format(BracketedFormatter)
        .with_writer(std::sync::Mutex::new(file))
        .with_ansi(false);

    let stdout_layer = fmt::layer()
        .event_format(BracketedFormatter)
        .with_writer(std::io::stdout);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("trace"));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();

    info!("Starting bird frame guidance");
    info!("Log file created at: {:?}", log_path);

    Ok(log_path)
}
