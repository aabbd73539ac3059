//! Hand landmark annotation
//!
//! Detection is delegated to an external model; this module defines the
//! detector seam, the landmark types and the overlay drawing step.

pub mod landmarks;
pub mod overlay;
pub mod process;

pub use landmarks::{HandPart, Handedness, Landmark, LandmarkSet, HAND_CONNECTIONS};
pub use overlay::{draw_landmarks, OverlayStyle, PartColors};
pub use process::ProcessDetector;

use crate::capture::Frame;
use thiserror::Error;

/// Detection errors
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Failed to start landmark model: {0}")]
    Spawn(std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid model response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Model protocol error: {0}")]
    Protocol(String),

    #[error("Landmark model exited")]
    Closed,

    #[error("Landmark model did not answer within {0:?}")]
    Timeout(std::time::Duration),

    #[error("Landmark model is still busy with an earlier frame")]
    Busy,
}

/// Finds hands in a frame
///
/// Implementations may keep model state between calls but must not modify
/// the frame.
pub trait LandmarkDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<LandmarkSet>, DetectError>;
}

/// Detector used when no model is configured
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDetector;

impl LandmarkDetector for NoopDetector {
    fn detect(&mut self, _frame: &Frame) -> Result<Vec<LandmarkSet>, DetectError> {
        Ok(Vec::new())
    }
}
