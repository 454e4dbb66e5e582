//! Stored-video analysis orchestration.
//!
//! Wires frame acquisition (sequential decoding, with per-timestamp seeking
//! as the fallback) into calibration and event segmentation.

/// Decode-then-analyze pipeline for a recorded video
pub mod video_analyzer;

pub use video_analyzer::{
    AnalysisOptions, FrameSource, VideoAnalysis, VideoAnalyzer, analyze_video_file,
};
