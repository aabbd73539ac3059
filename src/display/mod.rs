//! Preview display
//!
//! The display surface receives RGB frames from the controller. The Tauri
//! implementation encodes them as PNG and pushes them to the webview.

pub mod preview;

pub use preview::{PreviewFrame, PreviewWindow, PREVIEW_EVENT};

use crate::capture::{ChannelOrder, Frame};
use thiserror::Error;

/// Display errors
#[derive(Error, Debug)]
pub enum DisplayError {
    #[error("PNG encoding error: {0}")]
    Encode(#[from] png::EncodingError),

    #[error("Expected an RGB frame")]
    WrongOrder,

    #[error("Failed to deliver frame: {0}")]
    Emit(String),
}

/// Somewhere frames are shown
pub trait DisplaySurface: Send {
    /// Show an RGB frame
    fn render(&mut self, frame: &Frame) -> Result<(), DisplayError>;

    /// Stop showing frames
    fn close(&mut self);
}

/// Encode an RGB frame as PNG
pub fn encode_png(frame: &Frame) -> Result<Vec<u8>, DisplayError> {
    if frame.order() != ChannelOrder::Rgb {
        return Err(DisplayError::WrongOrder);
    }

    let mut buffer = Vec::new();
    {
        let mut encoder = png::Encoder::new(&mut buffer, frame.width(), frame.height());
        encoder.set_color(png::ColorType::Rgb);
        encoder.set_depth(png::BitDepth::Eight);
        encoder.set_compression(png::Compression::Fast);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(frame.data())?;
        writer.finish()?;
    }
    Ok(buffer)
}
