//! Capture trait definitions
//!
//! Platform-agnostic description of a camera and the frame source trait the
//! controller drives.

use super::frame::Frame;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Information about a camera/webcam
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraInfo {
    /// Device index as understood by `NokhwaCamera::open`
    pub index: u32,

    /// Device name
    pub name: String,

    /// Driver-provided description
    pub description: String,
}

/// Video resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Failed to acquire frame: {0}")]
    FrameAcquisition(String),

    #[error("Camera has been released")]
    Released,
}

/// A source of frames, e.g. a webcam
///
/// Implementations are owned by a single controller and are never read
/// concurrently.
pub trait FrameSource: Send {
    /// Request a capture resolution and return the one the device settled on.
    fn configure(&mut self, width: u32, height: u32) -> Result<Resolution, CaptureError>;

    /// Negotiated resolution; frames read afterwards have this size.
    fn resolution(&self) -> Resolution;

    /// Read the next frame. Must not block past the driver's timeout.
    fn read_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Release the device. Calling it again is a no-op.
    fn release(&mut self);
}
