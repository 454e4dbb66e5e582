//! Core library for measuring mechanical camera shutter speeds from a
//! frame-by-frame brightness signal.
//!
//! A recorded video is decoded to luma planes with ffmpeg, each frame is
//! reduced to a mean brightness, and the resulting sequence is calibrated and
//! segmented into shutter events whose (sub-frame weighted) durations become
//! shutter speeds. Live camera feeds use [`LiveEventDetector`] instead, a
//! state machine that calibrates itself on a dark baseline and one discarded
//! shutter fire.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use shutterscope_core::{AnalysisConfig, AnalysisOptions, analyze_video_file};
//! use shutterscope_core::analysis::{format_shutter_speed, measure_events};
//! use std::path::Path;
//!
//! let config = AnalysisConfig::default();
//! let options = AnalysisOptions::from_config(&config);
//! let analysis = analyze_video_file(Path::new("shutter.mp4"), &config, &options, &mut |_| {})
//!     .unwrap()
//!     .expect("no frames decoded");
//!
//! for result in measure_events(&analysis.events, analysis.fps, None) {
//!     println!("{}", format_shutter_speed(result.measured_speed));
//! }
//! ```

pub mod analysis;
pub mod config;
pub mod decoder;
pub mod error;
pub mod external;
pub mod file_logging;
pub mod hardware_decode;
pub mod live;
pub mod processing;
pub mod reporting;
pub mod utils;

// Re-exports for public API
pub use analysis::{
    BrightnessStats, RawEvent, ShutterEvent, ShutterSpeedResult, SpeedGroup, ThresholdMethod,
};
pub use config::{AnalysisConfig, AnalysisConfigBuilder, DecoderConfig, LiveDetectorConfig};
pub use decoder::{
    DecoderPhase, FfmpegFrameSeeker, FrameSeeker, LumaFrame, SequentialFrameDecoder, VideoTrack,
    calculate_brightness,
};
pub use error::{CoreError, CoreResult};
pub use external::{
    CrateFfprobeExecutor, FfmpegProcess, FfmpegSpawner, FfprobeExecutor, SidecarSpawner,
    check_dependency,
};
pub use hardware_decode::{add_hardware_decoding_to_command, is_hardware_decoding_available};
pub use live::{DetectedEvent, DetectorState, LiveEvent, LiveEventDetector};
pub use processing::{
    AnalysisOptions, FrameSource, VideoAnalysis, VideoAnalyzer, analyze_video_file,
};
pub use reporting::{
    AnalysisReport, brightness_timeline, generate_results_markdown, get_output_dir,
    save_results_json, save_results_markdown, save_timeline_csv, save_timeline_plot,
};
