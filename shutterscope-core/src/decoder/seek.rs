//! Per-timestamp frame retrieval, the slow fallback when sequential decoding
//! is unavailable.
//!
//! Every call starts a short-lived ffmpeg process that seeks with `-ss` and
//! emits a single raw luma frame.

use std::path::Path;

use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};

use super::{copy_luma_plane, VideoTrack};
use crate::config::DecoderConfig;
use crate::error::CoreResult;
use crate::external::{FfmpegProcess, FfmpegSpawner, FfprobeExecutor};
use crate::hardware_decode::add_hardware_decoding_to_command;

/// Reads single frames of a stored video by timestamp.
pub trait FrameSeeker {
    /// Metadata of the first video track, `Ok(None)` when there is none.
    fn probe(&self, input_path: &Path) -> CoreResult<Option<VideoTrack>>;

    /// Luma plane of the frame shown at `position_ms`, `Ok(None)` when no
    /// frame could be produced (e.g. past the end of the stream).
    fn frame_at(&self, input_path: &Path, position_ms: u64) -> CoreResult<Option<Vec<u8>>>;
}

/// [`FrameSeeker`] backed by one ffmpeg invocation per frame.
pub struct FfmpegFrameSeeker<'a, S: FfmpegSpawner, P: FfprobeExecutor> {
    spawner: &'a S,
    prober: &'a P,
    use_hw_decode: bool,
    pix_fmt: String,
}

impl<'a, S: FfmpegSpawner, P: FfprobeExecutor> FfmpegFrameSeeker<'a, S, P> {
    pub fn new(spawner: &'a S, prober: &'a P, config: &DecoderConfig) -> Self {
        Self {
            spawner,
            prober,
            use_hw_decode: config.use_hw_decode,
            pix_fmt: config.pix_fmt.clone(),
        }
    }

    fn build_command(&self, input_path: &Path, position_ms: u64) -> FfmpegCommand {
        let mut cmd = FfmpegCommand::new();
        cmd.hide_banner();
        add_hardware_decoding_to_command(&mut cmd, self.use_hw_decode);
        // Input seeking: -ss before -i
        cmd.arg("-ss");
        cmd.arg(format_seek_position(position_ms));
        cmd.input(input_path.to_string_lossy().as_ref());
        cmd.args(["-frames:v", "1", "-an", "-sn", "-f", "rawvideo", "-pix_fmt"]);
        cmd.arg(&self.pix_fmt);
        cmd.output("-");
        cmd
    }
}

impl<S: FfmpegSpawner, P: FfprobeExecutor> FrameSeeker for FfmpegFrameSeeker<'_, S, P> {
    fn probe(&self, input_path: &Path) -> CoreResult<Option<VideoTrack>> {
        self.prober.probe_video_track(input_path)
    }

    fn frame_at(&self, input_path: &Path, position_ms: u64) -> CoreResult<Option<Vec<u8>>> {
        let cmd = self.build_command(input_path, position_ms);
        let mut process = self.spawner.spawn(cmd)?;

        let mut luma = None;
        match process.take_events() {
            Ok(events) => {
                for event in events {
                    match event {
                        FfmpegEvent::OutputFrame(frame) => {
                            let mut plane =
                                vec![0u8; frame.width as usize * frame.height as usize];
                            copy_luma_plane(&frame.data, &mut plane);
                            luma = Some(plane);
                            break;
                        }
                        FfmpegEvent::Error(message)
                        | FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message) => {
                            log::debug!("ffmpeg seek at {} ms: {}", position_ms, message);
                        }
                        _ => {}
                    }
                }
            }
            Err(e) => log::warn!("Failed to read seek output at {} ms: {}", position_ms, e),
        }

        if let Err(e) = process.kill() {
            log::debug!("Seek process kill failed (may have exited): {}", e);
        }
        if let Err(e) = process.wait() {
            log::warn!("Failed to reap seek process: {}", e);
        }

        Ok(luma)
    }
}

/// Formats milliseconds as the seconds value ffmpeg's `-ss` expects.
fn format_seek_position(position_ms: u64) -> String {
    format!("{}.{:03}", position_ms / 1000, position_ms % 1000)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::mocks::{MockFfmpegSpawner, MockFfprobeExecutor, gray_frame};

    #[test]
    fn test_format_seek_position() {
        assert_eq!(format_seek_position(0), "0.000");
        assert_eq!(format_seek_position(1033), "1.033");
        assert_eq!(format_seek_position(61_500), "61.500");
    }

    #[test]
    fn test_frame_at_seeks_before_input() {
        let spawner = MockFfmpegSpawner::new();
        spawner.add_success_expectation("2.500", vec![gray_frame(2, 2, 90, 0.0), FfmpegEvent::Done]);
        let prober = MockFfprobeExecutor::new();
        let seeker = FfmpegFrameSeeker::new(&spawner, &prober, &DecoderConfig::default());

        let plane = seeker.frame_at(Path::new("clip.mov"), 2500).unwrap();
        assert_eq!(plane, Some(vec![90; 4]));

        let calls = spawner.get_received_calls();
        let args = &calls[0];
        let ss = args.iter().position(|a| a == "-ss").unwrap();
        let input = args.iter().position(|a| a == "-i").unwrap();
        assert!(ss < input);
        assert_eq!(args[ss + 1], "2.500");
        assert!(args.windows(2).any(|w| w == ["-frames:v", "1"]));
        assert_eq!(spawner.kill_count(), 1);
    }

    #[test]
    fn test_frame_at_past_end_is_none() {
        let spawner = MockFfmpegSpawner::new();
        spawner.add_success_expectation("99.000", vec![FfmpegEvent::Done]);
        let prober = MockFfprobeExecutor::new();
        let seeker = FfmpegFrameSeeker::new(&spawner, &prober, &DecoderConfig::default());
        assert_eq!(seeker.frame_at(Path::new("clip.mov"), 99_000).unwrap(), None);
    }

    #[test]
    fn test_spawn_failure_is_an_error() {
        let spawner = MockFfmpegSpawner::new();
        let prober = MockFfprobeExecutor::new();
        let seeker = FfmpegFrameSeeker::new(&spawner, &prober, &DecoderConfig::default());
        assert!(seeker.frame_at(Path::new("clip.mov"), 0).is_err());
    }
}
