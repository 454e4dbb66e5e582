// ============================================================================
// shutterscope-core/src/external/mod.rs
// ============================================================================
//
// EXTERNAL TOOLS: Interactions with ffmpeg and ffprobe
//
// This module encapsulates the external command-line tools the frame
// acquisition path depends on. Consumers receive traits so tests can inject
// mock processes and metadata instead of running real binaries.
//
// KEY COMPONENTS:
// - FfmpegSpawner / FfmpegProcess: process spawn, event stream, kill, wait
// - FfprobeExecutor: first-video-track metadata
// - Mocks: scripted implementations of the seams
// - Dependency checking for the CLI's preflight

use crate::error::{CoreError, CoreResult};

use std::io;
use std::process::{Command, Stdio};

// ============================================================================
// SUBMODULES
// ============================================================================

/// Contains traits and implementations for executing ffmpeg commands
pub mod ffmpeg_executor;

/// Contains traits and implementations for executing ffprobe commands
pub mod ffprobe_executor;

/// Scripted ffmpeg/ffprobe/seek backends for tests (`test-mocks` feature)
pub mod mocks;

// ============================================================================
// RE-EXPORTS
// ============================================================================

pub use ffmpeg_executor::{
    FfmpegEventStream, FfmpegProcess, FfmpegSpawner, SidecarProcess, SidecarSpawner,
    command_args,
};
pub use ffprobe_executor::{CrateFfprobeExecutor, FfprobeExecutor, parse_frame_rate};

// ============================================================================
// DEPENDENCY CHECKING
// ============================================================================

/// Checks if a required external command is available and executable.
///
/// Runs `<cmd_name> -version` and discards its output.
///
/// # Returns
///
/// * `Ok(())` - If the command could be started
/// * `Err(CoreError::DependencyNotFound)` - If the command is not found
/// * `Err(CoreError::CommandStart)` - If the command exists but fails to start
pub fn check_dependency(cmd_name: &str) -> CoreResult<()> {
    let result = Command::new(cmd_name)
        .arg("-version")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match result {
        Ok(_) => {
            log::debug!("Found dependency: {}", cmd_name);
            Ok(())
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::warn!("Dependency '{}' not found.", cmd_name);
            Err(CoreError::DependencyNotFound(cmd_name.to_string()))
        }
        Err(e) => {
            log::error!("Failed to start dependency check command '{}': {}", cmd_name, e);
            Err(CoreError::CommandStart(cmd_name.to_string(), e))
        }
    }
}
