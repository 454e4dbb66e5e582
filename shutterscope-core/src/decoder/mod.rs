// ============================================================================
// shutterscope-core/src/decoder/mod.rs
// ============================================================================
//
// FRAME ACQUISITION: Decoding Stored Videos into Luma Planes
//
// The sequential decoder streams every frame of a recording, in presentation
// order, out of an ffmpeg child process. The seek module is the slower
// fallback that pulls one frame per timestamp. Both hand the analyzer raw
// luma bytes; brightness is the sampled mean of those bytes.

pub mod seek;
pub mod sequential;

use serde::{Deserialize, Serialize};

pub use seek::{FfmpegFrameSeeker, FrameSeeker};
pub use sequential::SequentialFrameDecoder;

/// Metadata of the first video track of a container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoTrack {
    pub width: u32,
    pub height: u32,
    pub duration_us: Option<u64>,
    /// Average frame rate as reported by the container
    pub fps: Option<f64>,
    pub codec_name: Option<String>,
}

impl VideoTrack {
    /// Size in bytes of one luma plane.
    #[must_use]
    pub fn luma_len(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// Lifecycle of a decode session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderPhase {
    NotStarted,
    /// Input is still being fed to the decoder
    Decoding,
    /// Input exhausted; remaining output is being drained
    Draining,
    /// Output exhausted or the decoder was released
    Done,
}

/// A decoded frame's luma plane, borrowed from the decoder's reusable buffer.
#[derive(Debug, Clone, Copy)]
pub struct LumaFrame<'a> {
    pub data: &'a [u8],
    pub width: u32,
    pub height: u32,
    /// Zero-based index in decode order
    pub frame_index: u64,
    pub presentation_time_us: Option<u64>,
}

impl LumaFrame<'_> {
    /// Mean luma of the frame, sampling every `sample_step`-th byte.
    #[must_use]
    pub fn brightness(&self, sample_step: usize) -> f64 {
        calculate_brightness(self.data, sample_step)
    }
}

/// Mean of every `sample_step`-th byte of a luma plane.
///
/// An empty plane yields `0.0`; a step of `0` is treated as `1`.
#[must_use]
pub fn calculate_brightness(luma_plane: &[u8], sample_step: usize) -> f64 {
    let step = sample_step.max(1);
    let (sum, count) = luma_plane
        .iter()
        .step_by(step)
        .fold((0u64, 0u64), |(sum, count), &b| (sum + u64::from(b), count + 1));
    if count == 0 {
        return 0.0;
    }
    sum as f64 / count as f64
}

/// Copies the first `width * height` bytes of `src` into `dst`, zero-padding
/// short inputs. Returns the number of bytes actually copied.
pub(crate) fn copy_luma_plane(src: &[u8], dst: &mut [u8]) -> usize {
    let copied = src.len().min(dst.len());
    dst[..copied].copy_from_slice(&src[..copied]);
    dst[copied..].fill(0);
    copied
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brightness_sampling() {
        let plane = [0u8, 100, 200, 100, 50, 100, 150, 100];
        assert_eq!(calculate_brightness(&plane, 1), 100.0);
        // indices 0 and 4
        assert_eq!(calculate_brightness(&plane, 4), 25.0);
        assert_eq!(calculate_brightness(&plane, 0), 100.0);
        assert_eq!(calculate_brightness(&[], 4), 0.0);
    }

    #[test]
    fn test_copy_luma_plane_pads_and_truncates() {
        let mut dst = [9u8; 4];
        assert_eq!(copy_luma_plane(&[1, 2], &mut dst), 2);
        assert_eq!(dst, [1, 2, 0, 0]);

        assert_eq!(copy_luma_plane(&[5, 6, 7, 8, 128, 128], &mut dst), 4);
        assert_eq!(dst, [5, 6, 7, 8]);
    }
}
