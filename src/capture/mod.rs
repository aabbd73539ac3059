//! Camera capture
//!
//! This module provides the frame type, the frame source trait and the
//! nokhwa-backed webcam implementation.

pub mod frame;
pub mod traits;
pub mod webcam;

// Re-export common types
pub use frame::{ChannelOrder, Frame, FrameError};
pub use traits::{CameraInfo, CaptureError, FrameSource, Resolution};
pub use webcam::{list_cameras, NokhwaCamera};
