//! Hardware decoding detection and configuration.
//!
//! Currently only supports `VideoToolbox` hardware decoding on macOS. Frames
//! are still delivered to the analyzer as raw gray planes; acceleration only
//! affects the decode step inside ffmpeg.

use ffmpeg_sidecar::command::FfmpegCommand;
use std::env;

/// Checks if the current platform is macOS.
#[must_use]
pub fn is_macos() -> bool {
    env::consts::OS == "macos"
}

/// Checks if hardware decoding is available on the current platform.
#[must_use]
pub fn is_hardware_decoding_available() -> bool {
    is_macos()
}

/// Gets the ffmpeg arguments enabling hardware decoding, empty when
/// disabled or unavailable.
#[must_use]
pub fn hardware_decode_args(use_hw_decode: bool) -> Vec<&'static str> {
    if use_hw_decode && is_hardware_decoding_available() {
        vec!["-hwaccel", "videotoolbox"]
    } else {
        Vec::new()
    }
}

/// Adds hardware decoding options to an ffmpeg command.
///
/// IMPORTANT: This must be called BEFORE adding the input file to the command.
///
/// Returns whether hardware decoding was added.
pub fn add_hardware_decoding_to_command(cmd: &mut FfmpegCommand, use_hw_decode: bool) -> bool {
    let args = hardware_decode_args(use_hw_decode);
    if args.is_empty() {
        return false;
    }
    cmd.args(args);
    true
}

/// Gets a human-readable description of the hardware decoder, if any.
#[must_use]
pub fn get_hardware_decoding_info() -> Option<String> {
    is_hardware_decoding_available().then(|| "VideoToolbox".to_string())
}

/// Logs hardware decoding status.
pub fn log_hardware_decoding_status() {
    match get_hardware_decoding_info() {
        Some(decoder) => log::info!("Hardware decoding: {} available", decoder),
        None => log::info!("Hardware decoding: None"),
    }
}
