//! Frame buffers
//!
//! A frame is a packed 8-bit, 3-channel pixel buffer. The channel order is
//! carried with the buffer so every place that needs a different order has
//! to convert explicitly.

use super::traits::Resolution;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use thiserror::Error;

/// Order of the three color channels in a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    Rgb,
    Bgr,
}

impl ChannelOrder {
    /// FFmpeg `-pixel_format` name for raw frames in this order
    pub fn ffmpeg_pixel_format(&self) -> &'static str {
        match self {
            ChannelOrder::Rgb => "rgb24",
            ChannelOrder::Bgr => "bgr24",
        }
    }
}

/// Frame construction errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FrameError {
    #[error("Frame buffer is {actual} bytes, expected {expected} for {width}x{height}")]
    BufferSize {
        width: u32,
        height: u32,
        expected: usize,
        actual: usize,
    },
}

/// One captured image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    width: u32,
    height: u32,
    order: ChannelOrder,
    data: Vec<u8>,
}

impl Frame {
    pub const BYTES_PER_PIXEL: usize = 3;

    /// Wrap a packed pixel buffer, checking its length
    pub fn new(width: u32, height: u32, order: ChannelOrder, data: Vec<u8>) -> Result<Self, FrameError> {
        let expected = width as usize * height as usize * Self::BYTES_PER_PIXEL;
        if data.len() != expected {
            return Err(FrameError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            width,
            height,
            order,
            data,
        })
    }

    /// A frame where every pixel has the same value (given in `order`)
    pub fn filled(width: u32, height: u32, order: ChannelOrder, pixel: [u8; 3]) -> Self {
        let count = width as usize * height as usize;
        let mut data = Vec::with_capacity(count * Self::BYTES_PER_PIXEL);
        for _ in 0..count {
            data.extend_from_slice(&pixel);
        }
        Self {
            width,
            height,
            order,
            data,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn order(&self) -> ChannelOrder {
        self.order
    }

    pub fn resolution(&self) -> Resolution {
        Resolution {
            width: self.width,
            height: self.height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    /// Pixel at (x, y) in the frame's own channel order
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let offset = (y as usize * self.width as usize + x as usize) * Self::BYTES_PER_PIXEL;
        Some([self.data[offset], self.data[offset + 1], self.data[offset + 2]])
    }

    /// Borrow the frame if it is already in `order`, otherwise convert a copy
    pub fn to_order(&self, order: ChannelOrder) -> Cow<'_, Frame> {
        if self.order == order {
            return Cow::Borrowed(self);
        }
        let mut converted = self.clone();
        converted.convert_to(order);
        Cow::Owned(converted)
    }

    /// Convert the frame in place; RGB <-> BGR is a swap of the outer channels
    pub fn convert_to(&mut self, order: ChannelOrder) {
        if self.order == order {
            return;
        }
        for pixel in self.data.chunks_exact_mut(Self::BYTES_PER_PIXEL) {
            pixel.swap(0, 2);
        }
        self.order = order;
    }

    /// Mirror the frame left to right
    pub fn flip_horizontal(&mut self) {
        self.with_image(|img| image::imageops::flip_horizontal_in_place(img));
    }

    /// Run `f` over the buffer viewed as an `RgbImage`.
    ///
    /// The view ignores `order`; callers drawing colors must swap them for
    /// BGR frames themselves.
    pub(crate) fn with_image(&mut self, f: impl FnOnce(&mut RgbImage)) {
        let data = std::mem::take(&mut self.data);
        match RgbImage::from_raw(self.width, self.height, data) {
            Some(mut image) => {
                f(&mut image);
                self.data = image.into_raw();
            }
            None => {
                // Unreachable while the length invariant holds.
                tracing::error!("Frame buffer does not match {}x{}", self.width, self.height);
            }
        }
    }
}
