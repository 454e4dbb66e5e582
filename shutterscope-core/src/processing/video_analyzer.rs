// ============================================================================
// shutterscope-core/src/processing/video_analyzer.rs
// ============================================================================
//
// VIDEO ANALYZER: Brightness Extraction and Event Detection for Recordings
//
// Drives a recorded video through frame acquisition and the batch analysis
// stages, reporting progress to the caller along the way.
//
// WORKFLOW:
// 1. Decode every frame sequentially and sample its brightness
// 2. If that yields nothing (decoder unavailable, unreadable source, zero
//    frames), seek frame by frame at 1000/fps ms intervals instead
// 3. Calibrate the threshold, segment shutter events, estimate the peak
// 4. Attach baseline and peak to each event
//
// "No events" is a successful analysis with an empty event list; "no frames"
// from both strategies is `Ok(None)`.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::analysis::{
    BrightnessStats, ShutterEvent, ThresholdMethod, analyze_and_find_events,
    create_shutter_events,
};
use crate::config::{AnalysisConfig, DEFAULT_FALLBACK_FPS};
use crate::decoder::{
    FfmpegFrameSeeker, FrameSeeker, SequentialFrameDecoder, VideoTrack, calculate_brightness,
};
use crate::error::CoreResult;
use crate::external::{CrateFfprobeExecutor, FfmpegSpawner, FfprobeExecutor, SidecarSpawner};

// ============================================================================
// TYPES
// ============================================================================

/// Per-run analysis options.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AnalysisOptions {
    pub method: ThresholdMethod,
    /// Needed by the z-score method
    pub expected_events_count: Option<usize>,
    /// Takes precedence over the container's frame rate
    pub fps_override: Option<f64>,
}

impl AnalysisOptions {
    /// Options using the configured threshold method.
    pub fn from_config(config: &AnalysisConfig) -> Self {
        Self {
            method: config.method,
            ..Self::default()
        }
    }
}

/// Which acquisition strategy produced the brightness samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameSource {
    Sequential,
    Seek,
}

/// Outcome of analyzing one recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoAnalysis {
    pub events: Vec<ShutterEvent>,
    pub stats: BrightnessStats,
    pub frame_count: usize,
    pub fps: f64,
    pub source: FrameSource,
    #[serde(skip)]
    pub brightness_values: Vec<f64>,
}

// ============================================================================
// ANALYZER
// ============================================================================

/// Analyzes recorded videos using injectable ffmpeg, ffprobe and seek
/// backends.
pub struct VideoAnalyzer<'a, S: FfmpegSpawner, P: FfprobeExecutor, K: FrameSeeker> {
    spawner: &'a S,
    prober: &'a P,
    seeker: &'a K,
    config: &'a AnalysisConfig,
}

impl<'a, S: FfmpegSpawner, P: FfprobeExecutor, K: FrameSeeker> VideoAnalyzer<'a, S, P, K> {
    pub fn new(spawner: &'a S, prober: &'a P, seeker: &'a K, config: &'a AnalysisConfig) -> Self {
        Self {
            spawner,
            prober,
            seeker,
            config,
        }
    }

    /// Extracts per-frame brightness from `input_path` and detects shutter
    /// events in it.
    ///
    /// `progress` receives values in `[0, 1]` and always ends with `1.0`.
    ///
    /// # Returns
    ///
    /// * `Ok(Some(analysis))` - Frames were read; `events` may be empty
    /// * `Ok(None)` - Neither strategy produced a usable frame, including
    ///   when ffmpeg or ffprobe cannot run at all
    pub fn analyze_video(
        &self,
        input_path: &Path,
        options: &AnalysisOptions,
        progress: &mut dyn FnMut(f32),
    ) -> CoreResult<Option<VideoAnalysis>> {
        let acquired = match self.read_sequential(input_path, progress) {
            Some((values, track)) => Some((values, track, FrameSource::Sequential)),
            None => {
                log::info!(
                    "Sequential decoding unavailable for {}, falling back to frame seeking",
                    input_path.display()
                );
                self.read_by_seeking(input_path, options.fps_override, progress)
                    .map(|(values, track)| (values, Some(track), FrameSource::Seek))
            }
        };
        progress(1.0);

        let Some((brightness_values, track, source)) = acquired else {
            log::warn!("No usable frames in {}", input_path.display());
            return Ok(None);
        };

        let fps = resolve_fps(options.fps_override, track.as_ref());
        let (stats, raw_events) = analyze_and_find_events(
            &brightness_values,
            self.config,
            options.method,
            options.expected_events_count,
        );
        let events = create_shutter_events(&raw_events, &stats);

        Ok(Some(VideoAnalysis {
            events,
            stats,
            frame_count: brightness_values.len(),
            fps,
            source,
            brightness_values,
        }))
    }

    /// Fast path. `None` when the decoder cannot start or yields no frames.
    fn read_sequential(
        &self,
        input_path: &Path,
        progress: &mut dyn FnMut(f32),
    ) -> Option<(Vec<f64>, Option<VideoTrack>)> {
        let decoder_config = &self.config.decoder;
        let mut decoder = SequentialFrameDecoder::new(
            self.spawner,
            self.prober,
            input_path,
            decoder_config.clone(),
        );

        match decoder.start() {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                log::warn!("Sequential decoder failed to start: {}", e);
                return None;
            }
        }

        let interval = decoder_config.progress_interval_frames.max(1);
        let mut values = Vec::new();
        while let Some(frame) = decoder.decode_next_frame() {
            values.push(frame.brightness(decoder_config.sample_step));
            if values.len() as u64 % interval == 0 {
                progress(decoder.get_progress() as f32);
            }
        }

        let track = decoder.track().cloned();
        decoder.release();

        if values.is_empty() {
            log::warn!("Sequential decoder produced no frames");
            return None;
        }
        log::debug!("Decoded {} frame(s) sequentially", values.len());
        Some((values, track))
    }

    /// Slow path: one frame every `1000 / fps` ms across the duration.
    /// Seek failures count as missing frames.
    fn read_by_seeking(
        &self,
        input_path: &Path,
        fps_override: Option<f64>,
        progress: &mut dyn FnMut(f32),
    ) -> Option<(Vec<f64>, VideoTrack)> {
        let track = match self.seeker.probe(input_path) {
            Ok(Some(track)) => track,
            Ok(None) => {
                log::warn!("No video track found for frame seeking");
                return None;
            }
            Err(e) => {
                log::warn!("Frame seeking unavailable for {}: {}", input_path.display(), e);
                return None;
            }
        };
        let Some(duration_us) = track.duration_us.filter(|d| *d > 0) else {
            log::warn!("Video duration unknown, cannot sample by timestamp");
            return None;
        };

        let fps = resolve_fps(fps_override, Some(&track));
        let interval_ms = 1000.0 / fps;
        let duration_ms = duration_us as f64 / 1000.0;
        let total = (duration_ms / interval_ms).ceil().max(1.0) as usize;
        log::info!(
            "Sampling {} frame(s) at {:.2} ms intervals by seeking",
            total,
            interval_ms
        );

        let sample_step = self.config.decoder.sample_step;
        let mut values = Vec::with_capacity(total);
        let mut failures = 0usize;
        for index in 0..total {
            let position_ms = (index as f64 * interval_ms).round() as u64;
            match self.seeker.frame_at(input_path, position_ms) {
                Ok(Some(plane)) => values.push(calculate_brightness(&plane, sample_step)),
                Ok(None) => log::debug!("No frame at {} ms", position_ms),
                Err(e) => {
                    if failures == 0 {
                        log::warn!("Seek to {} ms failed: {}", position_ms, e);
                    } else {
                        log::debug!("Seek to {} ms failed: {}", position_ms, e);
                    }
                    failures += 1;
                }
            }
            progress((index + 1) as f32 / total as f32);
        }

        if failures > 0 {
            log::warn!("{} of {} seek(s) failed", failures, total);
        }
        if values.is_empty() {
            return None;
        }
        Some((values, track))
    }
}

/// Frame rate used for analysis: override, then container, then the default.
fn resolve_fps(fps_override: Option<f64>, track: Option<&VideoTrack>) -> f64 {
    fps_override
        .filter(|fps| fps.is_finite() && *fps > 0.0)
        .or_else(|| track.and_then(|t| t.fps))
        .unwrap_or(DEFAULT_FALLBACK_FPS)
}

/// Analyzes a video with the real ffmpeg and ffprobe backends.
pub fn analyze_video_file(
    input_path: &Path,
    config: &AnalysisConfig,
    options: &AnalysisOptions,
    progress: &mut dyn FnMut(f32),
) -> CoreResult<Option<VideoAnalysis>> {
    let spawner = SidecarSpawner;
    let prober = CrateFfprobeExecutor::new();
    let seeker = FfmpegFrameSeeker::new(&spawner, &prober, &config.decoder);
    VideoAnalyzer::new(&spawner, &prober, &seeker, config).analyze_video(input_path, options, progress)
}
