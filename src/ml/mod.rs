//! Hand detection module
//!
//! Defines the detector interface used by the capture loop, the 21-point
//! hand model, and the rule that turns landmarks into a finger state.

pub mod onnx;

use image::Rgba;

use crate::camera::Frame;
use crate::gesture::{Finger, FingerState, FINGER_COUNT};

pub use onnx::OnnxHandDetector;

/// Number of landmarks in the hand model
pub const LANDMARK_COUNT: usize = 21;

/// Detector errors
#[derive(Debug, thiserror::Error)]
pub enum DetectorError {
    #[error("Model not found: {0}")]
    ModelNotFound(String),
    #[error("Failed to initialize ONNX Runtime: {0}")]
    Runtime(String),
    #[error("Inference failed: {0}")]
    Inference(String),
}

/// Hand landmark (normalized coordinates)
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct HandLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// Detected hand
#[derive(Clone, Debug)]
pub struct Hand {
    /// 21 landmarks
    pub landmarks: [HandLandmark; LANDMARK_COUNT],
    /// Hand presence score
    pub confidence: f32,
    /// Is right hand
    pub is_right: bool,
}

impl Default for Hand {
    fn default() -> Self {
        Self {
            landmarks: [HandLandmark::default(); LANDMARK_COUNT],
            confidence: 0.0,
            is_right: false,
        }
    }
}

impl Hand {
    /// Which fingers are extended.
    ///
    /// The thumb counts as extended when its tip lies outward of the joint
    /// below it (to the right for a right hand, to the left for a left hand).
    /// The other fingers count as extended when the tip is above the joint two
    /// landmarks below it.
    pub fn fingers_up(&self) -> FingerState {
        let mut fingers = [false; FINGER_COUNT];

        let thumb_tip = self.landmarks[Finger::Thumb.tip_landmark()];
        let thumb_ip = self.landmarks[Finger::Thumb.tip_landmark() - 1];
        fingers[0] = if self.is_right {
            thumb_tip.x > thumb_ip.x
        } else {
            thumb_tip.x < thumb_ip.x
        };

        for finger in &Finger::ALL[1..] {
            let tip = finger.tip_landmark();
            fingers[*finger as usize] = self.landmarks[tip].y < self.landmarks[tip - 2].y;
        }

        FingerState::new(fingers)
    }

    /// Bounding box in normalized coordinates, `(min_x, min_y, max_x, max_y)`
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        self.landmarks.iter().fold(
            (f32::MAX, f32::MAX, f32::MIN, f32::MIN),
            |(x0, y0, x1, y1), lm| (x0.min(lm.x), y0.min(lm.y), x1.max(lm.x), y1.max(lm.y)),
        )
    }
}

/// Finds at most one hand in a frame
pub trait HandDetector {
    /// Detect a hand, annotating `frame` in place.
    ///
    /// Returns the finger state of the detected hand, if any.
    fn find_hands(&mut self, frame: &mut Frame) -> Result<Option<FingerState>, DetectorError>;
}

/// Detector used when no model is available; never reports a hand
#[derive(Clone, Copy, Debug, Default)]
pub struct Passthrough;

impl HandDetector for Passthrough {
    fn find_hands(&mut self, _frame: &mut Frame) -> Result<Option<FingerState>, DetectorError> {
        Ok(None)
    }
}

const LANDMARK_COLOR: Rgba<u8> = Rgba([255, 0, 255, 255]);
const BOX_COLOR: Rgba<u8> = Rgba([0, 255, 0, 255]);
const BOX_MARGIN: i64 = 20;

/// Draw landmark dots and a bounding box onto the frame
pub fn draw_hand(frame: &mut Frame, hand: &Hand) {
    let (w, h) = (frame.width() as f32, frame.height() as f32);

    for lm in &hand.landmarks {
        let cx = (lm.x * w) as i64;
        let cy = (lm.y * h) as i64;
        for dy in -2..=2 {
            for dx in -2..=2 {
                put_pixel_clipped(frame, cx + dx, cy + dy, LANDMARK_COLOR);
            }
        }
    }

    let (x0, y0, x1, y1) = hand.bounds();
    let left = (x0 * w) as i64 - BOX_MARGIN;
    let top = (y0 * h) as i64 - BOX_MARGIN;
    let right = (x1 * w) as i64 + BOX_MARGIN;
    let bottom = (y1 * h) as i64 + BOX_MARGIN;

    for x in left..=right {
        put_pixel_clipped(frame, x, top, BOX_COLOR);
        put_pixel_clipped(frame, x, bottom, BOX_COLOR);
    }
    for y in top..=bottom {
        put_pixel_clipped(frame, left, y, BOX_COLOR);
        put_pixel_clipped(frame, right, y, BOX_COLOR);
    }
}

fn put_pixel_clipped(frame: &mut Frame, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < frame.width() && (y as u32) < frame.height() {
        frame.put_pixel(x as u32, y as u32, color);
    }
}
