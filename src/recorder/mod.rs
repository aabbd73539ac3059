//! Recording system module
//!
//! - `FrameSink`/`SinkFactory` abstract the video file writer
//! - `FfmpegSinkFactory` encodes through an FFmpeg child process
//! - `AppController` runs the capture tick and the record/stop toggle
//! - `spawn_tick_driver` calls the controller on a fixed interval

pub mod controller;
pub mod ffmpeg;
pub mod sink;
pub mod state;
pub mod ticker;

pub use controller::{AppController, ControllerParts, ControllerSettings};
pub use ffmpeg::FfmpegSinkFactory;
pub use sink::{FourCc, FrameSink, SinkError, SinkFactory, SinkSpec};
pub use state::{
    ControllerStatus, RecordingError, RecordingEvent, RecordingResult, RecordingSession,
    RecordingState, RecordingSummary,
};
pub use ticker::{spawn_tick_driver, SharedController};
