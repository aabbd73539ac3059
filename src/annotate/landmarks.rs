//! Hand landmark types and the 21-point hand topology

use serde::{Deserialize, Serialize};

/// Number of landmarks in a full hand
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Index of the wrist landmark
pub const WRIST: usize = 0;

/// Bone connections between hand landmarks
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    // Thumb
    (0, 1), (1, 2), (2, 3), (3, 4),
    // Index
    (0, 5), (5, 6), (6, 7), (7, 8),
    // Middle
    (5, 9), (9, 10), (10, 11), (11, 12),
    // Ring
    (9, 13), (13, 14), (14, 15), (15, 16),
    // Pinky and palm base
    (13, 17), (0, 17), (17, 18), (18, 19), (19, 20),
];

/// Landmarks where the fingers meet the palm, plus the wrist
const PALM_LANDMARKS: [usize; 6] = [0, 1, 5, 9, 13, 17];

/// Region of the hand a landmark or connection belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandPart {
    Palm,
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl HandPart {
    pub fn of_landmark(index: usize) -> Self {
        if PALM_LANDMARKS.contains(&index) {
            return HandPart::Palm;
        }
        match index {
            1..=4 => HandPart::Thumb,
            5..=8 => HandPart::Index,
            9..=12 => HandPart::Middle,
            13..=16 => HandPart::Ring,
            _ => HandPart::Pinky,
        }
    }

    /// Palm edges join two palm landmarks; finger bones take the finger of
    /// their outer end.
    pub fn of_connection((from, to): (usize, usize)) -> Self {
        if PALM_LANDMARKS.contains(&from) && PALM_LANDMARKS.contains(&to) {
            HandPart::Palm
        } else {
            HandPart::of_landmark(from.max(to))
        }
    }
}

/// A keypoint in normalized image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// 0.0 = left edge, 1.0 = right edge
    pub x: f32,

    /// 0.0 = top edge, 1.0 = bottom edge
    pub y: f32,

    /// Relative depth, if the model provides it
    #[serde(default)]
    pub z: Option<f32>,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: None }
    }

    /// Position in pixels for an image of the given size
    pub fn to_pixel(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    Left,
    Right,
}

/// Landmarks for one detected hand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LandmarkSet {
    pub handedness: Option<Handedness>,
    pub points: Vec<Landmark>,
}

impl LandmarkSet {
    /// Connections whose both ends are present in this set
    pub fn connections(&self) -> impl Iterator<Item = (HandPart, &Landmark, &Landmark)> + '_ {
        HAND_CONNECTIONS.iter().filter_map(|&(from, to)| {
            Some((
                HandPart::of_connection((from, to)),
                self.points.get(from)?,
                self.points.get(to)?,
            ))
        })
    }
}
