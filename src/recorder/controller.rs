//! Application controller
//!
//! Owns the camera, detector, display and recording session for one run,
//! and exposes the named command handlers the front end binds to. The
//! periodic driver calls `tick` while `is_ticking` is true; ticks and
//! commands are serialized by whoever owns the controller.

use super::sink::{FourCc, SinkError, SinkFactory, SinkSpec};
use super::state::{
    ControllerStatus, RecordingError, RecordingEvent, RecordingResult, RecordingSession,
    RecordingState, RecordingSummary,
};
use crate::annotate::{draw_landmarks, LandmarkDetector, OverlayStyle};
use crate::capture::{ChannelOrder, FrameSource};
use crate::config::{AppConfig, ConfigError};
use crate::display::DisplaySurface;
use crate::utils::opener::FolderOpener;
use std::path::PathBuf;
use tokio::sync::broadcast;

/// Order the display surface expects
const DISPLAY_ORDER: ChannelOrder = ChannelOrder::Rgb;

/// Controller settings derived from `AppConfig`
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub output_dir: PathBuf,
    pub file_name: String,
    pub frame_rate: f64,
    pub codec: FourCc,
    /// Order frames are handed to the recording sink in
    pub recording_order: ChannelOrder,
    pub preview_while_idle: bool,
    pub mirror: bool,
}

impl ControllerSettings {
    pub fn from_config(config: &AppConfig, output_dir: PathBuf) -> Result<Self, ConfigError> {
        Ok(Self {
            output_dir,
            file_name: config.file_name.clone(),
            frame_rate: config.frame_rate,
            codec: config.codec()?,
            recording_order: ChannelOrder::Bgr,
            preview_while_idle: config.preview_while_idle,
            mirror: config.mirror,
        })
    }

    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join(&self.file_name)
    }
}

/// The pieces a controller drives
pub struct ControllerParts {
    pub camera: Box<dyn FrameSource>,
    pub detector: Box<dyn LandmarkDetector>,
    pub display: Box<dyn DisplaySurface>,
    pub sinks: Box<dyn SinkFactory>,
    pub opener: Box<dyn FolderOpener>,
}

/// Coordinates capture, annotation, preview and recording
pub struct AppController {
    camera: Box<dyn FrameSource>,
    detector: Box<dyn LandmarkDetector>,
    display: Box<dyn DisplaySurface>,
    sinks: Box<dyn SinkFactory>,
    opener: Box<dyn FolderOpener>,
    settings: ControllerSettings,
    overlay: OverlayStyle,

    /// Open recording, if any
    session: Option<RecordingSession>,

    /// Whether the periodic tick should run
    ticking: bool,

    /// Set once `exit` has released everything
    exited: bool,

    /// Event broadcaster
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl AppController {
    pub fn new(parts: ControllerParts, settings: ControllerSettings) -> Self {
        let (event_tx, _) = broadcast::channel(32);
        Self {
            camera: parts.camera,
            detector: parts.detector,
            display: parts.display,
            sinks: parts.sinks,
            opener: parts.opener,
            ticking: settings.preview_while_idle,
            settings,
            overlay: OverlayStyle::default(),
            session: None,
            exited: false,
            event_tx,
        }
    }

    pub fn with_overlay(mut self, overlay: OverlayStyle) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn state(&self) -> RecordingState {
        if self.session.is_some() {
            RecordingState::Recording
        } else {
            RecordingState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the driver should call `tick`
    pub fn is_ticking(&self) -> bool {
        self.ticking && !self.exited
    }

    pub fn has_exited(&self) -> bool {
        self.exited
    }

    pub fn output_dir(&self) -> &PathBuf {
        &self.settings.output_dir
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    pub fn status(&self) -> ControllerStatus {
        ControllerStatus {
            state: self.state(),
            output_dir: self.settings.output_dir.to_string_lossy().to_string(),
            output_path: self.settings.output_path().to_string_lossy().to_string(),
            frames_written: self.session.as_ref().map(|s| s.frames_written()).unwrap_or(0),
            resolution: self.camera.resolution(),
            ticking: self.is_ticking(),
        }
    }

    /// Start recording. Does nothing if already recording.
    pub fn start(&mut self) -> RecordingResult<()> {
        if self.exited {
            return Err(RecordingError::Exited);
        }
        if self.session.is_some() {
            tracing::debug!("Start requested while already recording");
            return Ok(());
        }

        let result = self.open_session();
        if let Err(ref e) = result {
            tracing::error!("Failed to start recording: {}", e);
            let _ = self.event_tx.send(RecordingEvent::Error {
                message: e.to_string(),
            });
        }
        result
    }

    fn open_session(&mut self) -> RecordingResult<()> {
        let output_dir = &self.settings.output_dir;
        std::fs::create_dir_all(output_dir).map_err(|source| RecordingError::DirectoryCreation {
            path: output_dir.clone(),
            source,
        })?;

        let spec = SinkSpec {
            path: self.settings.output_path(),
            frame_size: self.camera.resolution(),
            frame_rate: self.settings.frame_rate,
            codec: self.settings.codec,
            input_order: self.settings.recording_order,
        };
        let writer = self.sinks.open(&spec)?;

        tracing::info!(
            "Recording started: {:?} ({} @ {}fps, {})",
            spec.path,
            spec.frame_size,
            spec.frame_rate,
            spec.codec
        );

        let session = RecordingSession::new(spec.path.clone(), spec.frame_size, writer);
        let _ = self.event_tx.send(RecordingEvent::Started {
            path: spec.path.to_string_lossy().to_string(),
        });
        self.session = Some(session);
        self.ticking = true;
        Ok(())
    }

    /// Stop recording and finalize the file. Does nothing if idle.
    pub fn stop(&mut self) -> RecordingResult<Option<RecordingSummary>> {
        let Some(session) = self.session.take() else {
            return Ok(None);
        };

        if !self.settings.preview_while_idle {
            self.ticking = false;
        }

        let summary = session.finish()?;
        tracing::info!(
            "Recording stopped: {} frames in {:.0}ms",
            summary.frames_written,
            summary.duration_ms
        );
        let _ = self.event_tx.send(RecordingEvent::Stopped {
            summary: summary.clone(),
        });
        Ok(Some(summary))
    }

    /// Capture, annotate, preview and (when recording) write one frame
    pub fn tick(&mut self) {
        if self.exited {
            return;
        }

        let mut frame = match self.camera.read_frame() {
            Ok(frame) => frame,
            Err(e) => {
                // Transient misses are expected; try again next tick
                tracing::trace!("Skipping tick: {}", e);
                return;
            }
        };

        match self.detector.detect(&frame) {
            Ok(hands) => draw_landmarks(&mut frame, &hands, &self.overlay),
            Err(e) => tracing::debug!("Landmark detection failed: {}", e),
        }

        if self.settings.mirror {
            frame.flip_horizontal();
        }

        if let Err(e) = self.display.render(&frame.to_order(DISPLAY_ORDER)) {
            tracing::debug!("Preview render failed: {}", e);
        }

        let Some(session) = self.session.as_mut() else {
            return;
        };
        match session.write(&frame) {
            Ok(()) => {}
            Err(e @ SinkError::FrameSizeMismatch { .. }) => {
                tracing::warn!("Dropped frame for {:?}: {}", session.output_path, e);
            }
            Err(e) => self.abort_recording(e),
        }
    }

    /// End a session whose writer can no longer accept frames
    fn abort_recording(&mut self, error: SinkError) {
        let Some(session) = self.session.take() else {
            return;
        };
        if !self.settings.preview_while_idle {
            self.ticking = false;
        }

        let path = session.output_path.clone();
        let frames = session.frames_written();
        tracing::error!(
            "Recording to {:?} failed after {} frames: {}",
            path,
            frames,
            error
        );
        if let Err(e) = session.finish() {
            tracing::debug!("Closing failed writer: {}", e);
        }

        let _ = self.event_tx.send(RecordingEvent::Error {
            message: format!("Recording stopped after {frames} frames: {error}"),
        });
    }

    /// Stop recording, release the camera and close the display
    pub fn exit(&mut self) {
        if self.exited {
            return;
        }

        if let Err(e) = self.stop() {
            tracing::error!("Failed to finalize recording on exit: {}", e);
        }
        self.camera.release();
        self.display.close();
        self.ticking = false;
        self.exited = true;
        tracing::info!("Controller shut down");
    }

    /// Open the output directory in the system file browser
    pub fn open_output_folder(&self) -> RecordingResult<()> {
        let dir = &self.settings.output_dir;
        if !dir.is_dir() {
            tracing::warn!("Output folder does not exist: {:?}", dir);
            return Err(RecordingError::OutputFolderMissing(dir.clone()));
        }

        tracing::info!("Opening output folder: {:?}", dir);
        self.opener.open(dir).map_err(RecordingError::OpenFolder)
    }
}

impl Drop for AppController {
    fn drop(&mut self) {
        self.exit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotate::{DetectError, Landmark, LandmarkSet, NoopDetector};
    use crate::capture::{CaptureError, Frame, Resolution};
    use crate::display::DisplayError;
    use crate::recorder::sink::{FrameSink, SinkError};
    use parking_lot::Mutex;
    use std::collections::HashSet;
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use tempfile::tempdir;

    const SIZE: Resolution = Resolution { width: 8, height: 6 };

    struct FakeCamera {
        resolution: Resolution,
        reads: usize,
        /// 1-based read numbers that fail
        fail_on: HashSet<usize>,
        /// 1-based read numbers that return a frame of the wrong size
        wrong_size_on: HashSet<usize>,
        released: Arc<AtomicUsize>,
    }

    impl FakeCamera {
        fn new() -> Self {
            Self {
                resolution: SIZE,
                reads: 0,
                fail_on: HashSet::new(),
                wrong_size_on: HashSet::new(),
                released: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl FrameSource for FakeCamera {
        fn configure(&mut self, width: u32, height: u32) -> Result<Resolution, CaptureError> {
            // Pretend the driver only supports even sizes
            self.resolution = Resolution {
                width: width & !1,
                height: height & !1,
            };
            Ok(self.resolution)
        }

        fn resolution(&self) -> Resolution {
            self.resolution
        }

        fn read_frame(&mut self) -> Result<Frame, CaptureError> {
            self.reads += 1;
            if self.fail_on.contains(&self.reads) {
                return Err(CaptureError::FrameAcquisition("no frame".to_string()));
            }
            let Resolution { width, height } = if self.wrong_size_on.contains(&self.reads) {
                Resolution { width: 4, height: 4 }
            } else {
                self.resolution
            };
            let mut data = Vec::new();
            for y in 0..height {
                for x in 0..width {
                    data.extend_from_slice(&[x as u8, y as u8, 100]);
                }
            }
            Ok(Frame::new(width, height, ChannelOrder::Rgb, data).unwrap())
        }

        fn release(&mut self) {
            self.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct SinkLog {
        opened: Vec<SinkSpec>,
        frames: Vec<Frame>,
        closes: usize,
    }

    struct FakeSink {
        spec: SinkSpec,
        log: Arc<Mutex<SinkLog>>,
        written: u64,
        closed: bool,
        /// Encoder dies once this many frames are written
        fail_after: Option<u64>,
    }

    impl FrameSink for FakeSink {
        fn write_frame(&mut self, frame: &Frame) -> Result<(), SinkError> {
            if self.closed {
                return Err(SinkError::Closed);
            }
            if self.fail_after == Some(self.written) {
                return Err(SinkError::Io(std::io::Error::from(std::io::ErrorKind::BrokenPipe)));
            }
            self.spec.check_frame(frame)?;
            self.log
                .lock()
                .frames
                .push(frame.to_order(self.spec.input_order).into_owned());
            self.written += 1;
            Ok(())
        }

        fn close(&mut self) -> Result<(), SinkError> {
            if !self.closed {
                self.closed = true;
                self.log.lock().closes += 1;
            }
            Ok(())
        }

        fn frames_written(&self) -> u64 {
            self.written
        }
    }

    struct FakeSinkFactory {
        log: Arc<Mutex<SinkLog>>,
        fail: bool,
        fail_after: Option<u64>,
    }

    impl SinkFactory for FakeSinkFactory {
        fn open(&self, spec: &SinkSpec) -> Result<Box<dyn FrameSink>, SinkError> {
            if self.fail {
                return Err(SinkError::EncoderUnavailable("no XVID here".to_string()));
            }
            self.log.lock().opened.push(spec.clone());
            Ok(Box::new(FakeSink {
                spec: spec.clone(),
                log: self.log.clone(),
                written: 0,
                closed: false,
                fail_after: self.fail_after,
            }))
        }
    }

    #[derive(Default)]
    struct DisplayLog {
        frames: Vec<Frame>,
        closed: bool,
    }

    struct FakeDisplay(Arc<Mutex<DisplayLog>>);

    impl DisplaySurface for FakeDisplay {
        fn render(&mut self, frame: &Frame) -> Result<(), DisplayError> {
            self.0.lock().frames.push(frame.clone());
            Ok(())
        }

        fn close(&mut self) {
            self.0.lock().closed = true;
        }
    }

    struct FakeOpener(Arc<AtomicUsize>);

    impl FolderOpener for FakeOpener {
        fn open(&self, _path: &Path) -> std::io::Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    /// Reports one hand in the top-left corner of every frame
    struct CornerDetector(Arc<AtomicBool>);

    impl LandmarkDetector for CornerDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<LandmarkSet>, DetectError> {
            self.0.store(true, Ordering::SeqCst);
            Ok(vec![LandmarkSet {
                handedness: None,
                points: vec![Landmark::new(0.0, 0.0)],
            }])
        }
    }

    struct Harness {
        controller: AppController,
        sink_log: Arc<Mutex<SinkLog>>,
        display_log: Arc<Mutex<DisplayLog>>,
        opened_folders: Arc<AtomicUsize>,
        released: Arc<AtomicUsize>,
    }

    fn harness_with(camera: FakeCamera, output_dir: PathBuf, fail_encoder: bool, preview_while_idle: bool) -> Harness {
        let sink_log = Arc::new(Mutex::new(SinkLog::default()));
        let display_log = Arc::new(Mutex::new(DisplayLog::default()));
        let opened_folders = Arc::new(AtomicUsize::new(0));
        let released = camera.released.clone();

        let settings = ControllerSettings {
            output_dir,
            file_name: "output.avi".to_string(),
            frame_rate: 20.0,
            codec: FourCc::XVID,
            recording_order: ChannelOrder::Bgr,
            preview_while_idle,
            mirror: true,
        };
        let parts = ControllerParts {
            camera: Box::new(camera),
            detector: Box::new(NoopDetector),
            display: Box::new(FakeDisplay(display_log.clone())),
            sinks: Box::new(FakeSinkFactory {
                log: sink_log.clone(),
                fail: fail_encoder,
                fail_after: None,
            }),
            opener: Box::new(FakeOpener(opened_folders.clone())),
        };

        Harness {
            controller: AppController::new(parts, settings),
            sink_log,
            display_log,
            opened_folders,
            released,
        }
    }

    fn harness(output_dir: PathBuf) -> Harness {
        harness_with(FakeCamera::new(), output_dir, false, true)
    }

    fn ticks(controller: &mut AppController, n: usize) {
        for _ in 0..n {
            controller.tick();
        }
    }

    #[test]
    fn test_start_twice_is_start_once() {
        let dir = tempdir().unwrap();
        let mut h = harness(dir.path().join("videos"));

        h.controller.start().unwrap();
        h.controller.start().unwrap();

        assert_eq!(h.controller.state(), RecordingState::Recording);
        assert_eq!(h.sink_log.lock().opened.len(), 1);
    }

    #[test]
    fn test_start_creates_directory_and_declares_camera_size() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("nested").join("videos");
        let mut h = harness(output_dir.clone());

        h.controller.start().unwrap();

        assert!(output_dir.is_dir());
        let log = h.sink_log.lock();
        assert_eq!(log.opened[0].path, output_dir.join("output.avi"));
        assert_eq!(log.opened[0].frame_size, SIZE);
        assert_eq!(log.opened[0].frame_rate, 20.0);
    }

    #[test]
    fn test_stop_when_idle_touches_nothing() {
        let dir = tempdir().unwrap();
        let mut h = harness(dir.path().to_path_buf());

        assert!(h.controller.stop().unwrap().is_none());

        assert_eq!(h.controller.state(), RecordingState::Idle);
        let log = h.sink_log.lock();
        assert!(log.opened.is_empty());
        assert_eq!(log.closes, 0);
    }

    #[test]
    fn test_stop_without_frames_is_safe() {
        let dir = tempdir().unwrap();
        let mut h = harness(dir.path().to_path_buf());

        h.controller.start().unwrap();
        let summary = h.controller.stop().unwrap().unwrap();

        assert_eq!(summary.frames_written, 0);
        assert_eq!(h.sink_log.lock().closes, 1);
        assert_eq!(h.controller.state(), RecordingState::Idle);
    }

    #[test]
    fn test_only_frames_after_start_are_written() {
        let dir = tempdir().unwrap();
        let mut h = harness(dir.path().to_path_buf());

        ticks(&mut h.controller, 5);
        h.controller.start().unwrap();
        ticks(&mut h.controller, 10);
        let summary = h.controller.stop().unwrap().unwrap();

        assert_eq!(summary.frames_written, 10);
        assert_eq!(h.sink_log.lock().frames.len(), 10);
        // Preview ran for every tick
        assert_eq!(h.display_log.lock().frames.len(), 15);
    }

    #[test]
    fn test_camera_miss_skips_one_frame() {
        let dir = tempdir().unwrap();
        let mut camera = FakeCamera::new();
        camera.fail_on.insert(3);
        let mut h = harness_with(camera, dir.path().to_path_buf(), false, true);

        h.controller.start().unwrap();
        ticks(&mut h.controller, 10);

        assert_eq!(h.controller.state(), RecordingState::Recording);
        let summary = h.controller.stop().unwrap().unwrap();
        assert_eq!(summary.frames_written, 9);
        assert_eq!(h.display_log.lock().frames.len(), 9);
    }

    #[test]
    fn test_written_frames_share_first_frame_size() {
        let dir = tempdir().unwrap();
        let mut camera = FakeCamera::new();
        camera.wrong_size_on.insert(2);
        let mut h = harness_with(camera, dir.path().to_path_buf(), false, true);

        h.controller.start().unwrap();
        ticks(&mut h.controller, 4);
        h.controller.stop().unwrap();

        let log = h.sink_log.lock();
        assert_eq!(log.frames.len(), 3);
        let first = log.frames[0].resolution();
        assert!(log.frames.iter().all(|f| f.resolution() == first));
    }

    #[test]
    fn test_written_frame_is_mirrored_bgr_and_preview_is_rgb() {
        let dir = tempdir().unwrap();
        let mut h = harness(dir.path().to_path_buf());

        h.controller.start().unwrap();
        h.controller.tick();

        // Source pixel (x, y) is [x, y, 100] in RGB
        let last_column = SIZE.width - 1;
        let log = h.sink_log.lock();
        let written = &log.frames[0];
        assert_eq!(written.order(), ChannelOrder::Bgr);
        assert_eq!(written.pixel(0, 2), Some([100, 2, last_column as u8]));

        let display = h.display_log.lock();
        let shown = &display.frames[0];
        assert_eq!(shown.order(), ChannelOrder::Rgb);
        assert_eq!(shown.pixel(0, 2), Some([last_column as u8, 2, 100]));
    }

    #[test]
    fn test_overlay_is_drawn_before_mirroring() {
        let dir = tempdir().unwrap();
        let detected = Arc::new(AtomicBool::new(false));
        let mut h = harness(dir.path().to_path_buf());
        h.controller.detector = Box::new(CornerDetector(detected.clone()));

        h.controller.tick();

        assert!(detected.load(Ordering::SeqCst));
        let display = h.display_log.lock();
        let shown = &display.frames[0];
        let style = OverlayStyle::default();
        // Wrist drawn at top-left ends up at top-right after the flip
        assert_eq!(shown.pixel(SIZE.width - 1, 0), Some(style.point_colors.palm));
    }

    #[test]
    fn test_encoder_failure_leaves_idle() {
        let dir = tempdir().unwrap();
        let mut h = harness_with(FakeCamera::new(), dir.path().to_path_buf(), true, true);
        let mut events = h.controller.subscribe();

        let err = h.controller.start().unwrap_err();

        assert!(matches!(err, RecordingError::Sink(SinkError::EncoderUnavailable(_))));
        assert_eq!(h.controller.state(), RecordingState::Idle);
        assert!(matches!(events.try_recv(), Ok(RecordingEvent::Error { .. })));

        // Ticks keep working and write nothing
        ticks(&mut h.controller, 3);
        assert!(h.sink_log.lock().frames.is_empty());
    }

    #[test]
    fn test_encoder_death_mid_recording_returns_to_idle() {
        let dir = tempdir().unwrap();
        let sink_log = Arc::new(Mutex::new(SinkLog::default()));
        let mut h = harness(dir.path().to_path_buf());
        h.controller.sinks = Box::new(FakeSinkFactory {
            log: sink_log.clone(),
            fail: false,
            fail_after: Some(3),
        });
        let mut events = h.controller.subscribe();

        h.controller.start().unwrap();
        ticks(&mut h.controller, 10);

        assert_eq!(h.controller.state(), RecordingState::Idle);
        assert!(h.controller.is_ticking());
        let log = sink_log.lock();
        assert_eq!(log.frames.len(), 3);
        assert_eq!(log.closes, 1);
        drop(log);

        assert!(matches!(events.try_recv(), Ok(RecordingEvent::Started { .. })));
        assert!(matches!(
            events.try_recv(),
            Ok(RecordingEvent::Error { message }) if message.contains("after 3 frames")
        ));
        // Reported once, not once per tick
        assert!(events.try_recv().is_err());
        // Preview keeps running
        assert_eq!(h.display_log.lock().frames.len(), 10);

        // A later stop is a no-op and a new recording can start
        assert!(h.controller.stop().unwrap().is_none());
        h.controller.start().unwrap();
        assert_eq!(h.controller.state(), RecordingState::Recording);
    }

    #[test]
    fn test_directory_creation_failure() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();
        let mut h = harness(blocker.join("videos"));

        let err = h.controller.start().unwrap_err();

        assert!(matches!(err, RecordingError::DirectoryCreation { .. }));
        assert_eq!(h.controller.state(), RecordingState::Idle);
        assert!(h.sink_log.lock().opened.is_empty());
    }

    #[test]
    fn test_open_missing_folder_makes_no_os_call() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path().join("missing"));

        let err = h.controller.open_output_folder().unwrap_err();

        assert!(matches!(err, RecordingError::OutputFolderMissing(_)));
        assert_eq!(h.opened_folders.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_open_existing_folder() {
        let dir = tempdir().unwrap();
        let h = harness(dir.path().to_path_buf());

        h.controller.open_output_folder().unwrap();
        assert_eq!(h.opened_folders.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tick_schedule_without_idle_preview() {
        let dir = tempdir().unwrap();
        let mut h = harness_with(FakeCamera::new(), dir.path().to_path_buf(), false, false);

        assert!(!h.controller.is_ticking());
        h.controller.start().unwrap();
        assert!(h.controller.is_ticking());
        h.controller.stop().unwrap();
        assert!(!h.controller.is_ticking());
    }

    #[test]
    fn test_exit_finalizes_and_releases_once() {
        let dir = tempdir().unwrap();
        let mut h = harness(dir.path().to_path_buf());
        let mut events = h.controller.subscribe();

        h.controller.start().unwrap();
        ticks(&mut h.controller, 2);
        h.controller.exit();
        h.controller.exit();

        assert!(h.controller.has_exited());
        assert!(!h.controller.is_ticking());
        assert_eq!(h.sink_log.lock().closes, 1);
        assert_eq!(h.released.load(Ordering::SeqCst), 1);
        assert!(h.display_log.lock().closed);
        assert!(matches!(h.controller.start(), Err(RecordingError::Exited)));

        assert!(matches!(events.try_recv(), Ok(RecordingEvent::Started { .. })));
        assert!(matches!(events.try_recv(), Ok(RecordingEvent::Stopped { summary }) if summary.frames_written == 2));
    }

    #[test]
    fn test_status_reports_progress() {
        let dir = tempdir().unwrap();
        let mut h = harness(dir.path().to_path_buf());

        h.controller.start().unwrap();
        ticks(&mut h.controller, 3);
        let status = h.controller.status();

        assert_eq!(status.state, RecordingState::Recording);
        assert_eq!(status.frames_written, 3);
        assert_eq!(status.resolution, SIZE);
        assert!(status.output_path.ends_with("output.avi"));
    }
}
