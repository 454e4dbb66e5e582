// ============================================================================
// shutterscope-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Custom Error Types for shutterscope-core
//
// Errors are reserved for genuine failures (a tool that cannot be started,
// an unparsable expected-speed list, an invalid configuration). Degenerate
// signal input and unreadable videos are reported through fallback values
// and `Ok(None)`/`Ok(false)` results instead.

use std::io;
use std::process::ExitStatus;
use thiserror::Error;

/// Custom error type for shutterscope-core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to start {0}: {1}")]
    CommandStart(String, io::Error),

    #[error("Failed to wait for {0}: {1}")]
    CommandWait(String, io::Error),

    #[error("{0} failed with status {1}. Stderr: {2}")]
    CommandFailed(String, ExitStatus, String),

    #[error("ffprobe output parsing error: {0}")]
    FfprobeParse(String),

    #[error("Failed to parse JSON: {0}")]
    JsonParseError(String),

    #[error("Video info error: {0}")]
    VideoInfoError(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Required external command '{0}' not found or failed to execute")]
    DependencyNotFound(String),

    #[error("Invalid shutter speed '{0}'")]
    InvalidSpeed(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Report export error: {0}")]
    Export(String),

    #[error("Path error: {0}")]
    PathError(String),

    #[error("Operation failed: {0}")]
    OperationFailed(String),
}

/// Result type for shutterscope-core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Builds a [`CoreError::CommandStart`] for a process that could not be spawned.
pub fn command_start_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandStart(cmd.into(), err)
}

/// Builds a [`CoreError::CommandWait`] for a process whose exit could not be collected.
pub fn command_wait_error(cmd: impl Into<String>, err: io::Error) -> CoreError {
    CoreError::CommandWait(cmd.into(), err)
}

/// Builds a [`CoreError::CommandFailed`] from an exit status and captured stderr.
pub fn command_failed_error(
    cmd: impl Into<String>,
    status: ExitStatus,
    stderr: impl Into<String>,
) -> CoreError {
    CoreError::CommandFailed(cmd.into(), status, stderr.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_include_context() {
        let err = command_start_error("ffmpeg (decode)", io::Error::new(io::ErrorKind::NotFound, "missing"));
        assert_eq!(err.to_string(), "Failed to start ffmpeg (decode): missing");

        let err = CoreError::InvalidSpeed("1/x".to_string());
        assert_eq!(err.to_string(), "Invalid shutter speed '1/x'");
    }

    #[test]
    fn test_io_error_converts() {
        fn fails() -> CoreResult<()> {
            Err(io::Error::other("disk gone"))?
        }
        assert!(matches!(fails(), Err(CoreError::Io(_))));
    }
}
