//! Recording sink abstraction
//!
//! A sink accepts frames of one fixed size and finalizes a video file on
//! close. Sinks are opened through a `SinkFactory` so the controller can
//! create one per recording session.

use crate::capture::{ChannelOrder, Frame, Resolution};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Sink errors
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Encoder unavailable: {0}")]
    EncoderUnavailable(String),

    #[error("Frame size {actual} does not match recording size {expected}")]
    FrameSizeMismatch {
        expected: Resolution,
        actual: Resolution,
    },

    #[error("Sink is closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A FourCC string was not four ASCII characters
#[derive(Error, Debug, PartialEq, Eq)]
#[error("Invalid FourCC code: {0:?}")]
pub struct InvalidFourCc(pub String);

/// Four-character video codec code, e.g. `XVID`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FourCc([u8; 4]);

impl FourCc {
    pub const XVID: FourCc = FourCc(*b"XVID");

    /// FFmpeg encoder producing this codec, if one is known
    pub fn ffmpeg_encoder(&self) -> Option<&'static str> {
        match &self.0 {
            b"XVID" | b"DIVX" | b"FMP4" | b"MP4V" => Some("mpeg4"),
            b"MJPG" => Some("mjpeg"),
            b"H264" | b"X264" | b"AVC1" => Some("libx264"),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        // Construction only accepts ASCII
        std::str::from_utf8(&self.0).unwrap_or("????")
    }
}

impl FromStr for FourCc {
    type Err = InvalidFourCc;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.as_bytes();
        if bytes.len() != 4 || !bytes.iter().all(|b| b.is_ascii_alphanumeric()) {
            return Err(InvalidFourCc(s.to_string()));
        }
        let mut code = [0u8; 4];
        for (dst, src) in code.iter_mut().zip(bytes) {
            *dst = src.to_ascii_uppercase();
        }
        Ok(FourCc(code))
    }
}

impl fmt::Display for FourCc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything needed to open a sink
#[derive(Debug, Clone)]
pub struct SinkSpec {
    /// Output video file
    pub path: PathBuf,

    /// Size every written frame must have
    pub frame_size: Resolution,

    /// Frames per second written into the container
    pub frame_rate: f64,

    /// Video codec
    pub codec: FourCc,

    /// Channel order the encoder expects on its input
    pub input_order: ChannelOrder,
}

impl SinkSpec {
    /// Check a frame against the declared size
    pub fn check_frame(&self, frame: &Frame) -> Result<(), SinkError> {
        let actual = frame.resolution();
        if actual != self.frame_size {
            return Err(SinkError::FrameSizeMismatch {
                expected: self.frame_size,
                actual,
            });
        }
        Ok(())
    }
}

/// A video file writer
pub trait FrameSink: Send {
    /// Append a frame. The frame must match the declared size.
    fn write_frame(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// Flush and finalize the container. Calling it again is a no-op.
    fn close(&mut self) -> Result<(), SinkError>;

    /// Frames accepted so far
    fn frames_written(&self) -> u64;
}

/// Opens sinks for recording sessions
pub trait SinkFactory: Send {
    fn open(&self, spec: &SinkSpec) -> Result<Box<dyn FrameSink>, SinkError>;
}
