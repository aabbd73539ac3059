//! Landmark overlay drawing
//!
//! Each finger gets its own color, palm edges and knuckles share one, in
//! the style of MediaPipe's default hand drawing.

use super::landmarks::{HandPart, Landmark, LandmarkSet, WRIST};
use crate::capture::{ChannelOrder, Frame};
use image::Rgb;
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};

/// One RGB color per hand part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartColors {
    pub palm: [u8; 3],
    pub thumb: [u8; 3],
    pub index: [u8; 3],
    pub middle: [u8; 3],
    pub ring: [u8; 3],
    pub pinky: [u8; 3],
}

impl PartColors {
    pub fn get(&self, part: HandPart) -> [u8; 3] {
        match part {
            HandPart::Palm => self.palm,
            HandPart::Thumb => self.thumb,
            HandPart::Index => self.index,
            HandPart::Middle => self.middle,
            HandPart::Ring => self.ring,
            HandPart::Pinky => self.pinky,
        }
    }
}

const PEACH: [u8; 3] = [255, 229, 180];
const PURPLE: [u8; 3] = [128, 64, 128];
const YELLOW: [u8; 3] = [255, 204, 0];
const GREEN: [u8; 3] = [48, 255, 48];
const BLUE: [u8; 3] = [21, 101, 192];

/// Colors and sizes for the overlay. Colors are RGB.
#[derive(Debug, Clone)]
pub struct OverlayStyle {
    pub point_colors: PartColors,
    pub connection_colors: PartColors,
    pub point_radius: i32,
    pub wrist_radius: i32,
    /// Extra pixels drawn on each side of a connection line
    pub line_spread: i32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            point_colors: PartColors {
                palm: [255, 48, 48],
                thumb: PEACH,
                index: PURPLE,
                middle: YELLOW,
                ring: GREEN,
                pinky: BLUE,
            },
            connection_colors: PartColors {
                palm: [128, 128, 128],
                thumb: PEACH,
                index: PURPLE,
                middle: YELLOW,
                ring: GREEN,
                pinky: BLUE,
            },
            point_radius: 4,
            wrist_radius: 6,
            line_spread: 1,
        }
    }
}

fn pixel_for(order: ChannelOrder, [r, g, b]: [u8; 3]) -> Rgb<u8> {
    match order {
        ChannelOrder::Rgb => Rgb([r, g, b]),
        ChannelOrder::Bgr => Rgb([b, g, r]),
    }
}

/// Pixel position clamped to one frame size around the image, or `None`
/// for non-finite coordinates. Keeps line walks short for wild points.
fn clamped_pixel(point: &Landmark, width: u32, height: u32) -> Option<(f32, f32)> {
    let (x, y) = point.to_pixel(width, height);
    if !(x.is_finite() && y.is_finite()) {
        return None;
    }
    let (w, h) = (width as f32, height as f32);
    Some((x.clamp(-w, 2.0 * w), y.clamp(-h, 2.0 * h)))
}

/// Draw connections, then points, for every hand onto the frame
pub fn draw_landmarks(frame: &mut Frame, hands: &[LandmarkSet], style: &OverlayStyle) {
    if hands.is_empty() {
        return;
    }

    let (width, height) = (frame.width(), frame.height());
    let order = frame.order();

    frame.with_image(|image| {
        for hand in hands {
            for (part, from, to) in hand.connections() {
                let (Some((x0, y0)), Some((x1, y1))) =
                    (clamped_pixel(from, width, height), clamped_pixel(to, width, height))
                else {
                    continue;
                };
                let color = pixel_for(order, style.connection_colors.get(part));
                for offset in -style.line_spread..=style.line_spread {
                    let offset = offset as f32;
                    draw_line_segment_mut(image, (x0 + offset, y0), (x1 + offset, y1), color);
                    draw_line_segment_mut(image, (x0, y0 + offset), (x1, y1 + offset), color);
                }
            }

            for (i, point) in hand.points.iter().enumerate() {
                let Some((x, y)) = clamped_pixel(point, width, height) else {
                    continue;
                };
                let radius = if i == WRIST { style.wrist_radius } else { style.point_radius };
                let color = pixel_for(order, style.point_colors.get(HandPart::of_landmark(i)));
                draw_filled_circle_mut(image, (x.round() as i32, y.round() as i32), radius, color);
            }
        }
    });
}
