//! Webview preview surface

use super::{encode_png, DisplayError, DisplaySurface};
use crate::capture::Frame;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Serialize;
use tauri::{AppHandle, Emitter};

/// Event carrying preview frames to the front end
pub const PREVIEW_EVENT: &str = "preview-frame";

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewFrame {
    pub width: u32,
    pub height: u32,
    /// `data:image/png;base64,...`
    pub data_url: String,
}

impl PreviewFrame {
    pub fn from_frame(frame: &Frame) -> Result<Self, DisplayError> {
        let png = encode_png(frame)?;
        Ok(Self {
            width: frame.width(),
            height: frame.height(),
            data_url: format!("data:image/png;base64,{}", STANDARD.encode(png)),
        })
    }
}

/// Sends preview frames to the webview
pub struct PreviewWindow {
    app: AppHandle,
    closed: bool,
}

impl PreviewWindow {
    pub fn new(app: AppHandle) -> Self {
        Self { app, closed: false }
    }
}

impl DisplaySurface for PreviewWindow {
    fn render(&mut self, frame: &Frame) -> Result<(), DisplayError> {
        if self.closed {
            return Ok(());
        }
        let payload = PreviewFrame::from_frame(frame)?;
        self.app
            .emit(PREVIEW_EVENT, payload)
            .map_err(|e| DisplayError::Emit(e.to_string()))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::ChannelOrder;

    #[test]
    fn test_preview_frame_is_png_data_url() {
        let frame = Frame::filled(4, 4, ChannelOrder::Rgb, [1, 2, 3]);
        let preview = PreviewFrame::from_frame(&frame).unwrap();

        assert_eq!((preview.width, preview.height), (4, 4));
        let encoded = preview.data_url.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = STANDARD.decode(encoded).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }
}
