// ============================================================================
// shutterscope-core/src/external/mocks.rs
// ============================================================================
//
// MOCKS: Scripted ffmpeg, ffprobe and frame seeking backends
//
// Lets decoder and analyzer logic run without any external binary. Spawner
// expectations are matched by a substring of any command argument and used
// once each; every received command line is recorded for assertions.
//
// Only compiled for this crate's own tests or with the "test-mocks" feature.
#![cfg(any(test, feature = "test-mocks"))]

use crate::decoder::{FrameSeeker, VideoTrack};
use crate::error::{CoreError, CoreResult};
use crate::external::{FfmpegEventStream, FfmpegProcess, FfmpegSpawner, FfprobeExecutor, command_args};
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, OutputVideoFrame};
use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::rc::Rc;

/// Builds a raw gray output frame of uniform brightness.
pub fn gray_frame(width: u32, height: u32, value: u8, timestamp: f32) -> FfmpegEvent {
    FfmpegEvent::OutputFrame(OutputVideoFrame {
        width,
        height,
        pix_fmt: "gray".to_string(),
        output_index: 0,
        data: vec![value; width as usize * height as usize],
        frame_num: 0,
        timestamp,
    })
}

/// Mock implementation of [`FfmpegProcess`] replaying scripted events.
pub struct MockFfmpegProcess {
    events: Option<Vec<FfmpegEvent>>,
    kills: Rc<Cell<usize>>,
}

impl FfmpegProcess for MockFfmpegProcess {
    fn take_events(&mut self) -> CoreResult<FfmpegEventStream> {
        let events = self
            .events
            .take()
            .ok_or_else(|| CoreError::OperationFailed("mock events already taken".to_string()))?;
        Ok(Box::new(events.into_iter()))
    }

    fn kill(&mut self) -> CoreResult<()> {
        self.kills.set(self.kills.get() + 1);
        Ok(())
    }

    fn wait(&mut self) -> CoreResult<ExitStatus> {
        Ok(ExitStatus::default())
    }
}

struct MockFfmpegExpectation {
    arg_pattern: String,
    result: CoreResult<Vec<FfmpegEvent>>,
}

/// Mock implementation of [`FfmpegSpawner`] supporting multiple expectations.
#[derive(Clone, Default)]
pub struct MockFfmpegSpawner {
    expectations: Rc<RefCell<Vec<MockFfmpegExpectation>>>,
    received_calls: Rc<RefCell<Vec<Vec<String>>>>,
    kills: Rc<Cell<usize>>,
}

impl MockFfmpegSpawner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_success_expectation(&self, arg_pattern: &str, events: Vec<FfmpegEvent>) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            result: Ok(events),
        });
    }

    pub fn add_spawn_error_expectation(&self, arg_pattern: &str, error: CoreError) {
        self.expectations.borrow_mut().push(MockFfmpegExpectation {
            arg_pattern: arg_pattern.to_string(),
            result: Err(error),
        });
    }

    pub fn get_received_calls(&self) -> Vec<Vec<String>> {
        self.received_calls.borrow().clone()
    }

    /// Number of `kill()` calls across all spawned processes.
    pub fn kill_count(&self) -> usize {
        self.kills.get()
    }
}

impl FfmpegSpawner for MockFfmpegSpawner {
    type Process = MockFfmpegProcess;

    fn spawn(&self, cmd: FfmpegCommand) -> CoreResult<Self::Process> {
        let args = command_args(&cmd);
        self.received_calls.borrow_mut().push(args.clone());

        let mut expectations = self.expectations.borrow_mut();
        let Some(index) = expectations
            .iter()
            .position(|exp| args.iter().any(|arg| arg.contains(&exp.arg_pattern)))
        else {
            log::error!("MockFfmpegSpawner: no expectation for {:?}", args);
            return Err(CoreError::OperationFailed(format!(
                "MockFfmpegSpawner: no expectation for {args:?}"
            )));
        };

        let expectation = expectations.remove(index);
        log::debug!("MockFfmpegSpawner: matched '{}'", expectation.arg_pattern);
        expectation.result.map(|events| MockFfmpegProcess {
            events: Some(events),
            kills: Rc::clone(&self.kills),
        })
    }
}

/// Mock implementation of [`FfprobeExecutor`] keyed by input path.
#[derive(Clone, Default)]
pub struct MockFfprobeExecutor {
    tracks: Rc<RefCell<HashMap<PathBuf, Option<VideoTrack>>>>,
}

impl MockFfprobeExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` simulates a container without a video track.
    pub fn expect_video_track(&self, input_path: &Path, track: Option<VideoTrack>) {
        self.tracks
            .borrow_mut()
            .insert(input_path.to_path_buf(), track);
    }
}

impl FfprobeExecutor for MockFfprobeExecutor {
    fn probe_video_track(&self, input_path: &Path) -> CoreResult<Option<VideoTrack>> {
        self.tracks
            .borrow()
            .get(input_path)
            .cloned()
            .ok_or_else(|| {
                CoreError::FfprobeParse(format!(
                    "MockFfprobeExecutor: no expectation for {}",
                    input_path.display()
                ))
            })
    }
}

/// Mock implementation of [`FrameSeeker`] serving uniform frames whose
/// brightness is a function of the requested position.
pub struct MockFrameSeeker {
    track: Option<VideoTrack>,
    brightness_at: Box<dyn Fn(u64) -> Option<u8>>,
    requested: RefCell<Vec<u64>>,
}

impl MockFrameSeeker {
    pub fn new(track: Option<VideoTrack>, brightness_at: impl Fn(u64) -> Option<u8> + 'static) -> Self {
        Self {
            track,
            brightness_at: Box::new(brightness_at),
            requested: RefCell::new(Vec::new()),
        }
    }

    /// Positions (ms) requested so far, in call order.
    pub fn requested_positions(&self) -> Vec<u64> {
        self.requested.borrow().clone()
    }
}

impl FrameSeeker for MockFrameSeeker {
    fn probe(&self, _input_path: &Path) -> CoreResult<Option<VideoTrack>> {
        Ok(self.track.clone())
    }

    fn frame_at(&self, _input_path: &Path, position_ms: u64) -> CoreResult<Option<Vec<u8>>> {
        self.requested.borrow_mut().push(position_ms);
        let Some(track) = &self.track else {
            return Ok(None);
        };
        Ok((self.brightness_at)(position_ms).map(|value| vec![value; track.luma_len()]))
    }
}
