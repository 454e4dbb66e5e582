// shutterscope-core/tests/decoder_pipeline_tests.rs
//
// Drives the decoder, analyzer and report writers end to end against the
// scripted ffmpeg/ffprobe backends.

use ffmpeg_sidecar::event::FfmpegEvent;
use shutterscope_core::external::mocks::{
    MockFfmpegSpawner, MockFfprobeExecutor, MockFrameSeeker, gray_frame,
};
use shutterscope_core::{
    AnalysisConfig, AnalysisOptions, AnalysisReport, CoreError, DecoderConfig, DecoderPhase,
    FrameSource, SequentialFrameDecoder, VideoAnalyzer, VideoTrack, generate_results_markdown,
    get_output_dir, save_results_json, save_results_markdown,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

const CLIP: &str = "shutter_test.mp4";

fn track(duration_us: u64, fps: f64) -> VideoTrack {
    VideoTrack {
        width: 4,
        height: 4,
        duration_us: Some(duration_us),
        fps: Some(fps),
        codec_name: Some("hevc".to_string()),
    }
}

/// One dark second at 240 fps with two shutter fires of 4 and 8 frames.
fn two_fire_frames() -> Vec<FfmpegEvent> {
    let mut events: Vec<FfmpegEvent> = (0..240)
        .map(|i| {
            let lit = (60..64).contains(&i) || (150..158).contains(&i);
            gray_frame(4, 4, if lit { 230 } else { 8 }, i as f32 / 240.0)
        })
        .collect();
    events.push(FfmpegEvent::LogEOF);
    events.push(FfmpegEvent::Done);
    events
}

#[test]
fn test_release_is_safe_after_failed_start() {
    let spawner = MockFfmpegSpawner::new();
    let prober = MockFfprobeExecutor::new();
    prober.expect_video_track(Path::new(CLIP), None);

    let mut decoder = SequentialFrameDecoder::new(&spawner, &prober, CLIP, DecoderConfig::default());
    assert!(!decoder.start().unwrap());
    decoder.release();
    decoder.release();
    assert!(decoder.decode_next_frame().is_none());
}

#[test]
fn test_decoder_streams_every_frame() {
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("rawvideo", two_fire_frames());
    let prober = MockFfprobeExecutor::new();
    prober.expect_video_track(Path::new(CLIP), Some(track(1_000_000, 240.0)));

    let mut decoder = SequentialFrameDecoder::new(&spawner, &prober, CLIP, DecoderConfig::default());
    assert!(decoder.start().unwrap());

    let mut lit = 0;
    while let Some(frame) = decoder.decode_next_frame() {
        if frame.brightness(4) > 100.0 {
            lit += 1;
        }
    }
    assert_eq!(decoder.frame_count(), 240);
    assert_eq!(lit, 12);
    assert_eq!(decoder.phase(), DecoderPhase::Done);

    decoder.release();
    decoder.release();
    assert_eq!(spawner.kill_count(), 1);
}

#[test]
fn test_analysis_to_report_files() {
    let spawner = MockFfmpegSpawner::new();
    spawner.add_success_expectation("rawvideo", two_fire_frames());
    let prober = MockFfprobeExecutor::new();
    prober.expect_video_track(Path::new(CLIP), Some(track(1_000_000, 240.0)));
    let seeker = MockFrameSeeker::new(None, |_| None);
    let config = AnalysisConfig::default();

    let analysis = VideoAnalyzer::new(&spawner, &prober, &seeker, &config)
        .analyze_video(Path::new(CLIP), &AnalysisOptions::default(), &mut |_| {})
        .unwrap()
        .expect("frames decoded");
    assert_eq!(analysis.source, FrameSource::Sequential);
    assert_eq!(analysis.frame_count, 240);
    assert_eq!(analysis.fps, 240.0);
    assert_eq!(analysis.events.len(), 2);

    let report = AnalysisReport::new(Path::new(CLIP), &analysis, None, Some(&[30.0, 60.0][..]));
    let markdown = generate_results_markdown(&report);
    assert!(markdown.contains("| 1 | 60 | 63 | 4 | 4.00 | 1/60 |"));
    assert!(markdown.contains("| 2 | 150 | 157 | 8 | 8.00 | 1/30 |"));
    assert!(markdown.contains("## Comparison with Expected"));

    let base = tempdir().unwrap();
    let output_dir = get_output_dir(base.path(), Path::new(CLIP)).unwrap();
    assert!(output_dir.ends_with("shutter_test"));
    let md_path = save_results_markdown(&output_dir, &markdown).unwrap();
    let json_path = save_results_json(&output_dir, &report).unwrap();
    assert!(fs::read_to_string(md_path).unwrap().starts_with("# Shutter Speed Analysis Results"));
    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(json_path).unwrap()).unwrap();
    assert_eq!(json["comparison"].as_array().map(Vec::len), Some(2));
}

#[test]
fn test_fallback_seeking_when_ffmpeg_missing() {
    let spawner = MockFfmpegSpawner::new();
    spawner.add_spawn_error_expectation("rawvideo", CoreError::DependencyNotFound("ffmpeg".to_string()));
    let prober = MockFfprobeExecutor::new();
    prober.expect_video_track(Path::new(CLIP), Some(track(500_000, 20.0)));
    let seeker = MockFrameSeeker::new(Some(track(500_000, 20.0)), |ms| {
        Some(if (200..300).contains(&ms) { 250 } else { 5 })
    });
    let config = AnalysisConfig::default();

    let analysis = VideoAnalyzer::new(&spawner, &prober, &seeker, &config)
        .analyze_video(Path::new(CLIP), &AnalysisOptions::default(), &mut |_| {})
        .unwrap()
        .expect("frames sampled");

    assert_eq!(analysis.source, FrameSource::Seek);
    assert_eq!(seeker.requested_positions().len(), 10);
    assert_eq!(analysis.events.len(), 1);
    assert_eq!(analysis.events[0].duration_frames(), 2);
}
