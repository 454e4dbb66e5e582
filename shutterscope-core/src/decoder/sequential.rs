// ============================================================================
// shutterscope-core/src/decoder/sequential.rs
// ============================================================================
//
// SEQUENTIAL DECODER: Presentation-Order Frame Streaming via ffmpeg
//
// ffmpeg decodes the first video track to raw gray frames on stdout. A pump
// thread moves the sidecar event iterator's output into a bounded channel so
// that every poll of the decoder waits at most `codec_timeout_us`.
//
// SESSION LIFECYCLE:
// NotStarted --start()--> Decoding --input EOF--> Draining --output EOF--> Done
// release() tears everything down from any phase and is idempotent.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel, OutputVideoFrame};

use super::{copy_luma_plane, DecoderPhase, LumaFrame, VideoTrack};
use crate::config::DecoderConfig;
use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegProcess, FfmpegSpawner, FfprobeExecutor};
use crate::hardware_decode::add_hardware_decoding_to_command;

/// How long `release()` waits for the pump thread before detaching it.
const PUMP_JOIN_TIMEOUT: Duration = Duration::from_millis(500);
const PUMP_JOIN_POLL: Duration = Duration::from_millis(5);

/// Streams luma planes of a stored video in presentation order.
///
/// One instance owns one decode session exclusively; dropping it releases the
/// ffmpeg process and the pump thread.
pub struct SequentialFrameDecoder<'a, S: FfmpegSpawner, P: FfprobeExecutor> {
    spawner: &'a S,
    prober: &'a P,
    input: PathBuf,
    config: DecoderConfig,
    phase: DecoderPhase,
    track: Option<VideoTrack>,
    process: Option<S::Process>,
    receiver: Option<Receiver<FfmpegEvent>>,
    pump: Option<JoinHandle<()>>,
    buffer: Vec<u8>,
    width: u32,
    height: u32,
    frame_count: u64,
    last_presentation_us: Option<u64>,
}

impl<'a, S: FfmpegSpawner, P: FfprobeExecutor> SequentialFrameDecoder<'a, S, P> {
    pub fn new(spawner: &'a S, prober: &'a P, input: impl AsRef<Path>, config: DecoderConfig) -> Self {
        Self {
            spawner,
            prober,
            input: input.as_ref().to_path_buf(),
            config,
            phase: DecoderPhase::NotStarted,
            track: None,
            process: None,
            receiver: None,
            pump: None,
            buffer: Vec::new(),
            width: 0,
            height: 0,
            frame_count: 0,
            last_presentation_us: None,
        }
    }

    /// Opens the container, configures ffmpeg and starts decoding.
    ///
    /// Returns `Ok(false)` when the input has no usable video track or the
    /// decoder could not be configured; anything acquired so far is released
    /// first. Starting twice is an error.
    pub fn start(&mut self) -> CoreResult<bool> {
        if self.phase != DecoderPhase::NotStarted {
            return Err(CoreError::Decoder(format!(
                "decoder for {} was already started",
                self.input.display()
            )));
        }

        let track = match self.prober.probe_video_track(&self.input) {
            Ok(Some(track)) => track,
            Ok(None) => {
                log::warn!("No video track in {}", self.input.display());
                return Ok(false);
            }
            Err(e) => {
                log::warn!("Could not open {}: {}", self.input.display(), e);
                return Ok(false);
            }
        };

        let mut cmd = FfmpegCommand::new();
        cmd.hide_banner();
        if add_hardware_decoding_to_command(&mut cmd, self.config.use_hw_decode) {
            log::debug!("Using hardware decoding for {}", self.input.display());
        }
        cmd.input(self.input.to_string_lossy().as_ref());
        cmd.args(["-map", "0:v:0", "-an", "-sn", "-f", "rawvideo", "-pix_fmt"]);
        cmd.arg(&self.config.pix_fmt);
        cmd.output("-");

        let mut process = match self.spawner.spawn(cmd) {
            Ok(process) => process,
            Err(e) => {
                log::warn!("Failed to start decoder for {}: {}", self.input.display(), e);
                self.release();
                return Ok(false);
            }
        };

        let events = match process.take_events() {
            Ok(events) => events,
            Err(e) => {
                log::warn!("Failed to read decoder output: {}", e);
                self.process = Some(process);
                self.release();
                return Ok(false);
            }
        };
        self.process = Some(process);

        let (tx, rx) = mpsc::sync_channel(self.config.prefetch_frames.max(1));
        let pump = thread::Builder::new()
            .name("ffmpeg-event-pump".to_string())
            .spawn(move || {
                for event in events {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            });
        match pump {
            Ok(handle) => self.pump = Some(handle),
            Err(e) => {
                log::warn!("Failed to start decoder event pump: {}", e);
                self.release();
                return Ok(false);
            }
        }

        log::info!(
            "Decoding {} ({}x{}, {}, {})",
            self.input.display(),
            track.width,
            track.height,
            track
                .fps
                .map_or_else(|| "unknown fps".to_string(), |fps| format!("{fps:.2} fps")),
            track.codec_name.as_deref().unwrap_or("unknown codec")
        );

        self.width = track.width;
        self.height = track.height;
        self.buffer = vec![0; track.luma_len()];
        self.track = Some(track);
        self.receiver = Some(rx);
        self.phase = DecoderPhase::Decoding;
        Ok(true)
    }

    /// Returns the next frame, or `None` at end of stream.
    ///
    /// Each wait on the decoder is bounded by `codec_timeout_us`; the call
    /// keeps polling until a frame or the end of the output arrives. Once the
    /// stream has ended, further calls return `None` immediately.
    pub fn decode_next_frame(&mut self) -> Option<LumaFrame<'_>> {
        let timeout = Duration::from_micros(self.config.codec_timeout_us.max(1));

        loop {
            if matches!(self.phase, DecoderPhase::NotStarted | DecoderPhase::Done) {
                return None;
            }
            let Some(receiver) = self.receiver.as_ref() else {
                self.phase = DecoderPhase::Done;
                return None;
            };

            match receiver.recv_timeout(timeout) {
                Ok(FfmpegEvent::OutputFrame(frame)) => {
                    self.accept_frame(frame);
                    break;
                }
                Ok(FfmpegEvent::LogEOF) => {
                    if self.phase == DecoderPhase::Decoding {
                        log::debug!("Decoder input exhausted, draining output");
                        self.phase = DecoderPhase::Draining;
                    }
                }
                Ok(FfmpegEvent::Done) => {
                    self.finish_output();
                    return None;
                }
                Ok(FfmpegEvent::Error(message)) => {
                    log::warn!("ffmpeg error while decoding: {}", message);
                }
                Ok(FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, message)) => {
                    log::warn!("ffmpeg: {}", message);
                }
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => {
                    self.finish_output();
                    return None;
                }
            }
        }

        Some(LumaFrame {
            data: &self.buffer,
            width: self.width,
            height: self.height,
            frame_index: self.frame_count - 1,
            presentation_time_us: self.last_presentation_us,
        })
    }

    fn accept_frame(&mut self, frame: OutputVideoFrame) {
        if frame.width != self.width || frame.height != self.height {
            log::info!(
                "Decoder output format changed: {}x{} -> {}x{}",
                self.width,
                self.height,
                frame.width,
                frame.height
            );
            self.width = frame.width;
            self.height = frame.height;
            let len = self.width as usize * self.height as usize;
            if len != self.buffer.len() {
                self.buffer = vec![0; len];
            }
        }

        let copied = copy_luma_plane(&frame.data, &mut self.buffer);
        if copied < self.buffer.len() {
            log::debug!(
                "Short frame {} ({} of {} luma bytes), zero-padded",
                self.frame_count,
                copied,
                self.buffer.len()
            );
        }

        if frame.timestamp.is_finite() && frame.timestamp >= 0.0 {
            self.last_presentation_us = Some((f64::from(frame.timestamp) * 1_000_000.0).round() as u64);
        }
        self.frame_count += 1;
    }

    fn finish_output(&mut self) {
        if self.phase != DecoderPhase::Done {
            log::debug!("Decoder output exhausted after {} frame(s)", self.frame_count);
        }
        self.phase = DecoderPhase::Done;
    }

    /// Fraction of the track decoded so far, `1.0` once the output ended.
    #[must_use]
    pub fn get_progress(&self) -> f64 {
        if self.phase == DecoderPhase::Done && self.track.is_some() {
            return 1.0;
        }
        match (self.last_presentation_us, self.duration_us()) {
            (Some(pts), Some(duration)) if duration > 0 => {
                (pts as f64 / duration as f64).clamp(0.0, 1.0)
            }
            _ => 0.0,
        }
    }

    /// Stops ffmpeg and the event pump. Every step runs even if an earlier
    /// one fails; failures are logged. Safe to call repeatedly and on a
    /// decoder that never started.
    pub fn release(&mut self) {
        // Dropping the receiver unblocks a pump waiting on a full channel.
        self.receiver = None;

        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.kill() {
                log::debug!("Decoder process kill failed (may have exited): {}", e);
            }
            match process.wait() {
                Ok(status) => log::debug!("Decoder process exited with {}", status),
                Err(e) => log::warn!("Failed to reap decoder process: {}", e),
            }
        }

        if let Some(handle) = self.pump.take() {
            let deadline = Instant::now() + PUMP_JOIN_TIMEOUT;
            while !handle.is_finished() && Instant::now() < deadline {
                thread::sleep(PUMP_JOIN_POLL);
            }
            if handle.is_finished() {
                if handle.join().is_err() {
                    log::warn!("Decoder event pump panicked");
                }
            } else {
                log::warn!("Decoder event pump did not stop in time, detaching it");
            }
        }

        if self.phase != DecoderPhase::NotStarted {
            self.phase = DecoderPhase::Done;
        }
        self.buffer = Vec::new();
    }

    pub fn phase(&self) -> DecoderPhase {
        self.phase
    }

    pub fn track(&self) -> Option<&VideoTrack> {
        self.track.as_ref()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn duration_us(&self) -> Option<u64> {
        self.track.as_ref().and_then(|t| t.duration_us)
    }

    pub fn input(&self) -> &Path {
        &self.input
    }
}

impl<S: FfmpegSpawner, P: FfprobeExecutor> Drop for SequentialFrameDecoder<'_, S, P> {
    fn drop(&mut self) {
        self.release();
    }
}
