use anyhow::{Context, Result};
use log::LevelFilter;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;

const FILE_APPENDER: &str = "session";
const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l:<5}] {t} - {m}{n}";

/// Routes all `log` output to `log_file` at `log_level`.
///
/// Sessions append to an existing file. ffmpeg-sidecar's own records are
/// capped at `warn` since it reports every stderr line it parses.
/// Installs the global logger, so it can only succeed once per process.
pub fn setup_file_logging(log_file: &Path, log_level: LevelFilter) -> Result<()> {
    if let Some(parent) = log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating log directory {}", parent.display()))?;
    }

    let session = FileAppender::builder()
        .append(true)
        .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
        .build(log_file)
        .with_context(|| format!("opening log file {}", log_file.display()))?;

    let config = Config::builder()
        .appender(Appender::builder().build(FILE_APPENDER, Box::new(session)))
        .logger(Logger::builder().build("ffmpeg_sidecar", log_level.min(LevelFilter::Warn)))
        .build(Root::builder().appender(FILE_APPENDER).build(log_level))?;

    log4rs::init_config(config)?;
    log::info!("Logging to {}", log_file.display());

    Ok(())
}
