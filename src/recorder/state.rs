//! Recording state management
//!
//! Defines the recording state, the open recording session and the events
//! and summaries reported to the front end.

use super::sink::{FrameSink, SinkError};
use crate::capture::{Frame, Resolution};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

/// Current state of the recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    Idle,
    /// Frames are being written to a file
    Recording,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Recording errors
#[derive(Error, Debug)]
pub enum RecordingError {
    #[error("Failed to create output directory {path:?}: {source}")]
    DirectoryCreation {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("Output folder does not exist: {0:?}")]
    OutputFolderMissing(PathBuf),

    #[error("Failed to open output folder: {0}")]
    OpenFolder(std::io::Error),

    #[error("Recorder has shut down")]
    Exited,
}

pub type RecordingResult<T> = Result<T, RecordingError>;

/// An open recording: one output file and its writer
pub struct RecordingSession {
    /// Session identifier
    pub id: Uuid,

    /// Output video file
    pub output_path: PathBuf,

    /// Size every written frame has
    pub frame_size: Resolution,

    /// Wall clock start
    pub started_at: DateTime<Utc>,

    started: Instant,
    writer: Box<dyn FrameSink>,
}

impl RecordingSession {
    pub fn new(output_path: PathBuf, frame_size: Resolution, writer: Box<dyn FrameSink>) -> Self {
        Self {
            id: Uuid::new_v4(),
            output_path,
            frame_size,
            started_at: Utc::now(),
            started: Instant::now(),
            writer,
        }
    }

    pub fn write(&mut self, frame: &Frame) -> Result<(), SinkError> {
        self.writer.write_frame(frame)
    }

    pub fn frames_written(&self) -> u64 {
        self.writer.frames_written()
    }

    pub fn duration_ms(&self) -> f64 {
        self.started.elapsed().as_secs_f64() * 1000.0
    }

    /// Close the writer and describe what was recorded
    pub fn finish(mut self) -> Result<RecordingSummary, SinkError> {
        self.writer.close()?;
        Ok(RecordingSummary {
            session_id: self.id,
            output_path: self.output_path.to_string_lossy().to_string(),
            frames_written: self.writer.frames_written(),
            duration_ms: self.duration_ms(),
            started_at: self.started_at,
        })
    }
}

/// Result of a completed recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSummary {
    pub session_id: Uuid,

    /// Path to the video file
    pub output_path: String,

    pub frames_written: u64,

    /// Wall time between start and stop
    pub duration_ms: f64,

    pub started_at: DateTime<Utc>,
}

/// Snapshot of the controller for the front end
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerStatus {
    pub state: RecordingState,
    pub output_dir: String,
    pub output_path: String,
    pub frames_written: u64,
    pub resolution: Resolution,
    pub ticking: bool,
}

/// Events emitted by the controller
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RecordingEvent {
    /// Recording started
    Started { path: String },
    /// Recording stopped
    Stopped { summary: RecordingSummary },
    /// A command failed
    Error { message: String },
}
