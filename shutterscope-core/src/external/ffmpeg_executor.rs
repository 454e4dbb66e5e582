// ============================================================================
// shutterscope-core/src/external/ffmpeg_executor.rs
// ============================================================================
//
// FFMPEG EXECUTOR: FFmpeg Process Management and Abstraction
//
// Traits for spawning ffmpeg and consuming its event stream, plus the
// ffmpeg-sidecar backed implementation. The decoder moves the event iterator
// onto a pump thread, so iterators handed out here must be `Send`.
//
// KEY COMPONENTS:
// - FfmpegProcess: an active ffmpeg child (events, kill, wait)
// - FfmpegSpawner: creates FfmpegProcess instances from an FfmpegCommand
// - SidecarSpawner / SidecarProcess: ffmpeg-sidecar implementation

use crate::error::{CoreResult, command_failed_error, command_start_error, command_wait_error};
use ffmpeg_sidecar::child::FfmpegChild as SidecarChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::FfmpegEvent;
use std::process::ExitStatus;

/// Boxed stream of events produced by a running ffmpeg process.
pub type FfmpegEventStream = Box<dyn Iterator<Item = FfmpegEvent> + Send>;

/// Trait representing an active ffmpeg process instance.
pub trait FfmpegProcess {
    /// Takes the event stream of the process. Can only succeed once.
    fn take_events(&mut self) -> CoreResult<FfmpegEventStream>;

    /// Terminates the process.
    fn kill(&mut self) -> CoreResult<()>;

    /// Waits for the process to exit and returns its status.
    fn wait(&mut self) -> CoreResult<ExitStatus>;
}

/// Trait representing something that can spawn an FfmpegProcess.
pub trait FfmpegSpawner {
    type Process: FfmpegProcess;
    /// Spawns the ffmpeg command, consuming the command object.
    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process>;
}

/// Wrapper around `ffmpeg_sidecar::child::FfmpegChild` implementing `FfmpegProcess`.
pub struct SidecarProcess(SidecarChild);

impl FfmpegProcess for SidecarProcess {
    fn take_events(&mut self) -> CoreResult<FfmpegEventStream> {
        let iterator = self.0.iter().map_err(|e| {
            log::error!("Failed to get ffmpeg event iterator: {}", e);
            command_failed_error(
                "ffmpeg (sidecar - get iter)",
                ExitStatus::default(),
                e.to_string(),
            )
        })?;
        Ok(Box::new(iterator))
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.0
            .kill()
            .map_err(|e| command_wait_error("ffmpeg (sidecar - kill)", e))
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        self.0
            .wait()
            .map_err(|e| command_wait_error("ffmpeg (sidecar)", e))
    }
}

/// Concrete implementation of `FfmpegSpawner` using `ffmpeg-sidecar`.
#[derive(Debug, Clone, Default)]
pub struct SidecarSpawner;

impl FfmpegSpawner for SidecarSpawner {
    type Process = SidecarProcess;

    fn spawn(&self, mut cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        log::debug!("Spawning ffmpeg: {:?}", cmd);
        cmd.spawn()
            .map(SidecarProcess)
            .map_err(|e| command_start_error("ffmpeg (sidecar)", e))
    }
}

/// Collects the arguments of a command as owned strings, for logging and tests.
pub fn command_args(cmd: &FfmpegCommand) -> Vec<String> {
    cmd.get_args()
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect()
}
