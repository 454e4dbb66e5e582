//! FFprobe integration for reading container and video track metadata.
//!
//! The decoder and the fallback frame seeker only need the first video
//! track: its dimensions, duration and frame rate. The [`FfprobeExecutor`]
//! trait is the seam that lets tests supply metadata without ffprobe.

use crate::decoder::VideoTrack;
use crate::error::{CoreError, CoreResult, command_failed_error, command_start_error};
use ffprobe::{FfProbeError, ffprobe};
use std::path::Path;

/// Trait for reading video track metadata from a container.
pub trait FfprobeExecutor {
    /// Returns the first video track, or `Ok(None)` when the container has none.
    fn probe_video_track(&self, input_path: &Path) -> CoreResult<Option<VideoTrack>>;
}

/// Implementation of [`FfprobeExecutor`] using the `ffprobe` crate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrateFfprobeExecutor;

impl CrateFfprobeExecutor {
    pub fn new() -> Self {
        Self
    }
}

impl FfprobeExecutor for CrateFfprobeExecutor {
    fn probe_video_track(&self, input_path: &Path) -> CoreResult<Option<VideoTrack>> {
        log::debug!(
            "Running ffprobe (via crate) for video track on: {}",
            input_path.display()
        );
        let metadata = ffprobe(input_path).map_err(|err| {
            log::warn!("ffprobe failed for {}: {:?}", input_path.display(), err);
            map_ffprobe_error(err, "video track")
        })?;

        let Some(stream) = metadata
            .streams
            .iter()
            .find(|s| s.codec_type.as_deref() == Some("video"))
        else {
            log::warn!("No video stream found in {}", input_path.display());
            return Ok(None);
        };

        let (Some(width), Some(height)) = (stream.width, stream.height) else {
            return Err(CoreError::VideoInfoError(format!(
                "Video stream missing dimensions in {}",
                input_path.display()
            )));
        };
        if width <= 0 || height <= 0 {
            return Err(CoreError::VideoInfoError(format!(
                "Invalid dimensions found in {}: width={}, height={}",
                input_path.display(),
                width,
                height
            )));
        }

        let duration_secs = stream
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .or_else(|| {
                metadata
                    .format
                    .duration
                    .as_deref()
                    .and_then(|d| d.parse::<f64>().ok())
            });

        let fps = parse_frame_rate(&stream.avg_frame_rate)
            .or_else(|| parse_frame_rate(&stream.r_frame_rate));

        Ok(Some(VideoTrack {
            width: width as u32,
            height: height as u32,
            duration_us: duration_secs
                .filter(|d| d.is_finite() && *d >= 0.0)
                .map(|d| (d * 1_000_000.0).round() as u64),
            fps,
            codec_name: stream.codec_name.clone(),
        }))
    }
}

/// Parses an ffprobe rational frame rate such as `"30000/1001"` or `"60"`.
/// Returns `None` for `"0/0"` and other unusable values.
pub fn parse_frame_rate(rate: &str) -> Option<f64> {
    let value = match rate.split_once('/') {
        Some((num, den)) => {
            let num = num.trim().parse::<f64>().ok()?;
            let den = den.trim().parse::<f64>().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => rate.trim().parse::<f64>().ok()?,
    };
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Maps an `ffprobe` crate error onto [`CoreError`], keeping stderr when available.
pub fn map_ffprobe_error(err: FfProbeError, context: &str) -> CoreError {
    match err {
        FfProbeError::Io(io_err) => command_start_error(format!("ffprobe ({context})"), io_err),
        FfProbeError::Status(output) => {
            let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
            command_failed_error(format!("ffprobe ({context})"), output.status, stderr)
        }
        FfProbeError::Deserialize(err) => CoreError::JsonParseError(format!(
            "ffprobe {context} output deserialization: {err}"
        )),
        _ => CoreError::FfprobeParse(format!(
            "Unknown ffprobe error during {context}: {err:?}"
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("240/1"), Some(240.0));
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("60"), Some(60.0));
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate(""), None);
    }

    #[test]
    fn test_missing_file_is_an_error_not_a_panic() {
        let result = CrateFfprobeExecutor::new()
            .probe_video_track(Path::new("/definitely/not/here/shutter.mp4"));
        assert!(result.is_err());
    }
}
