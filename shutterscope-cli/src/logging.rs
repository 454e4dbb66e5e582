// ============================================================================
// shutterscope-cli/src/logging.rs
// ============================================================================
//
// LOGGING UTILITIES: Console logger setup and helpers
//
// The application logs through the `log` facade. Console output goes through
// `env_logger`; `--log-file` additionally installs the core's file logger.
//
// USAGE:
// - RUST_LOG=info (default): Normal operation logs
// - RUST_LOG=debug or -v: Decoder and calibration details
// - RUST_LOG=trace: Very verbose debugging information

use std::io::Write;
use std::path::Path;

use log::LevelFilter;

use crate::error::{CliErrorContext, CliResult};

/// Returns the current local timestamp formatted as "YYYYMMDD_HHMMSS".
///
/// # Example
/// ```
/// use shutterscope_cli::logging::get_timestamp;
///
/// let log_filename = format!("shutterscope_{}.log", get_timestamp());
/// assert!(log_filename.starts_with("shutterscope_"));
/// ```
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d_%H%M%S").to_string()
}

/// Level used when RUST_LOG is not set.
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Initializes console logging, or file logging when `log_file` is given.
///
/// log4rs and env_logger both claim the global logger, so only one of them
/// can be active per process.
pub fn init_logging(verbose: bool, log_file: Option<&Path>) -> CliResult<()> {
    let level = default_level(verbose);

    if let Some(path) = log_file {
        return shutterscope_core::file_logging::setup_file_logging(path, level)
            .map_err(|e| shutterscope_core::CoreError::OperationFailed(e.to_string()))
            .cli_with_context(|| format!("Failed to set up log file {}", path.display()));
    }

    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} [{:<5}] {}",
                chrono::Local::now().format("%H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .try_init()
        .map_err(|e| shutterscope_core::CoreError::OperationFailed(e.to_string()))
        .cli_context("Failed to initialize logging")
}
