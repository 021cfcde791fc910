//! ONNX Runtime hand landmark detector
//!
//! Runs a MediaPipe-compatible hand landmark model (PINTO Model Zoo export)
//! on the whole frame. The model takes a 224x224 NHWC RGB float image and
//! returns 21 landmarks in input pixels, a hand presence score and a
//! handedness score.
//!
//! There is no palm detection stage in front of the landmark model, so the
//! frame is never cropped to the hand. The model expects a hand that fills
//! most of its input; at normal webcam distance the landmarks, and so the
//! finger states, are unreliable. Hold the hand close to the camera.

use std::path::{Path, PathBuf};

use ndarray::Array4;

use super::{draw_hand, DetectorError, Hand, HandDetector, HandLandmark, LANDMARK_COUNT};
use crate::camera::Frame;
use crate::gesture::FingerState;

/// Model file looked up in the models directory
pub const MODEL_FILE: &str = "hand_landmark.onnx";

const INPUT_SIZE: u32 = 224;

/// Hand detector backed by an ONNX Runtime session
pub struct OnnxHandDetector {
    session: ort::session::Session,
    /// Minimum presence score to report a hand
    confidence: f32,
}

impl OnnxHandDetector {
    /// Load the landmark model.
    ///
    /// `model_dir` overrides the search for a `models` directory.
    pub fn new(model_dir: Option<&Path>, confidence: f32) -> Result<Self, DetectorError> {
        let dir = match model_dir {
            Some(dir) => dir.to_path_buf(),
            None => find_model_dir()?,
        };
        let model_path = dir.join(MODEL_FILE);
        if !model_path.exists() {
            return Err(DetectorError::ModelNotFound(model_path.display().to_string()));
        }

        ort::init()
            .with_name("HandControl")
            .commit()
            .map_err(|e| DetectorError::Runtime(e.to_string()))?;

        let session = ort::session::Session::builder()
            .map_err(|e| {
                DetectorError::Runtime(format!("Failed to create session builder: {}", e))
            })?
            .with_intra_threads(2)
            .map_err(|e| DetectorError::Runtime(format!("Failed to set threads: {}", e)))?
            .commit_from_file(&model_path)
            .map_err(|e| DetectorError::Runtime(format!("Failed to load hand model: {}", e)))?;

        log::info!("Loaded hand landmark model from {:?}", model_path);

        Ok(Self {
            session,
            confidence,
        })
    }

    /// Run the model and decode the most likely hand
    fn infer(&mut self, frame: &Frame) -> Result<Option<Hand>, DetectorError> {
        let input = preprocess_nhwc(frame, INPUT_SIZE, INPUT_SIZE);
        let shape = (1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3);
        let input_array = Array4::from_shape_vec(shape, input)
            .map_err(|e| DetectorError::Inference(format!("Failed to create input array: {}", e)))?;
        let input_tensor = ort::value::Tensor::from_array(input_array)
            .map_err(|e| DetectorError::Inference(format!("Failed to create tensor: {}", e)))?;

        let outputs = self
            .session
            .run(ort::inputs![input_tensor])
            .map_err(|e| DetectorError::Inference(e.to_string()))?;

        let mut tensors: Vec<Vec<f32>> = Vec::with_capacity(3);
        for (_name, value) in outputs.iter() {
            let (_shape, data) = value
                .try_extract_tensor::<f32>()
                .map_err(|e| DetectorError::Inference(format!("Failed to extract output: {}", e)))?;
            tensors.push(data.to_vec());
        }

        decode_outputs(&tensors, INPUT_SIZE as f32, self.confidence)
    }
}

impl HandDetector for OnnxHandDetector {
    fn find_hands(&mut self, frame: &mut Frame) -> Result<Option<FingerState>, DetectorError> {
        let Some(hand) = self.infer(frame)? else {
            return Ok(None);
        };
        draw_hand(frame, &hand);
        Ok(Some(hand.fingers_up()))
    }
}

/// Turn raw model outputs into a hand.
///
/// Output order: landmarks (63 values), presence, handedness.
fn decode_outputs(
    tensors: &[Vec<f32>],
    input_size: f32,
    confidence: f32,
) -> Result<Option<Hand>, DetectorError> {
    let [landmarks, presence, handedness, ..] = tensors else {
        return Err(DetectorError::Inference(format!(
            "Expected 3 model outputs, got {}",
            tensors.len()
        )));
    };

    if landmarks.len() < LANDMARK_COUNT * 3 {
        return Err(DetectorError::Inference(format!(
            "Expected {} landmark values, got {}",
            LANDMARK_COUNT * 3,
            landmarks.len()
        )));
    }

    let score = presence.first().copied().unwrap_or(0.0);
    if score < confidence {
        return Ok(None);
    }

    let mut hand = Hand {
        confidence: score,
        is_right: handedness.first().copied().unwrap_or(0.0) > 0.5,
        ..Default::default()
    };
    for (i, lm) in hand.landmarks.iter_mut().enumerate() {
        *lm = HandLandmark {
            x: landmarks[i * 3] / input_size,
            y: landmarks[i * 3 + 1] / input_size,
            z: landmarks[i * 3 + 2] / input_size,
        };
    }

    Ok(Some(hand))
}

/// Resize and convert to HWC RGB floats in [0, 1]
fn preprocess_nhwc(frame: &Frame, target_width: u32, target_height: u32) -> Vec<f32> {
    let mut output = vec![0.0f32; (target_width * target_height * 3) as usize];

    let x_ratio = frame.width() as f32 / target_width as f32;
    let y_ratio = frame.height() as f32 / target_height as f32;

    for y in 0..target_height {
        for x in 0..target_width {
            let src_x = ((x as f32 * x_ratio) as u32).min(frame.width().saturating_sub(1));
            let src_y = ((y as f32 * y_ratio) as u32).min(frame.height().saturating_sub(1));
            let pixel = frame.get_pixel(src_x, src_y);

            let out_idx = ((y * target_width + x) * 3) as usize;
            output[out_idx] = pixel[0] as f32 / 255.0;
            output[out_idx + 1] = pixel[1] as f32 / 255.0;
            output[out_idx + 2] = pixel[2] as f32 / 255.0;
        }
    }

    output
}

/// Find the models directory
fn find_model_dir() -> Result<PathBuf, DetectorError> {
    // Next to the executable, then up to three levels above it (cargo target dirs)
    if let Ok(exe_path) = std::env::current_exe() {
        for dir in exe_path.ancestors().skip(1).take(4) {
            let model_dir = dir.join("models");
            if model_dir.exists() {
                return Ok(model_dir);
            }
        }
    }

    if let Ok(cwd) = std::env::current_dir() {
        let model_dir = cwd.join("models");
        if model_dir.exists() {
            return Ok(model_dir);
        }
    }

    Err(DetectorError::ModelNotFound(
        "Models directory not found. Create a 'models' directory containing hand_landmark.onnx."
            .to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn landmark_output(y_of_tip: f32) -> Vec<f32> {
        let mut values = Vec::new();
        for i in 0..LANDMARK_COUNT {
            let y = if i % 4 == 0 && i > 0 { y_of_tip } else { 150.0 };
            values.extend_from_slice(&[112.0, y, 0.0]);
        }
        values
    }

    #[test]
    fn test_decode_below_confidence() {
        let tensors = vec![landmark_output(50.0), vec![0.5], vec![0.9]];
        assert!(decode_outputs(&tensors, 224.0, 0.8).unwrap().is_none());
    }

    #[test]
    fn test_decode_hand() {
        let tensors = vec![landmark_output(50.0), vec![0.95], vec![0.9]];
        let hand = decode_outputs(&tensors, 224.0, 0.8).unwrap().unwrap();

        assert!(hand.is_right);
        assert!((hand.landmarks[8].y - 50.0 / 224.0).abs() < 1e-6);
        assert!((hand.landmarks[0].x - 0.5).abs() < 1e-6);
        assert_eq!(hand.fingers_up(), FingerState::from_flags([0, 1, 1, 1, 1]));
    }

    #[test]
    fn test_decode_rejects_short_outputs() {
        assert!(decode_outputs(&[vec![0.0; 10]], 224.0, 0.8).is_err());
        assert!(decode_outputs(&[vec![0.0; 10], vec![1.0], vec![1.0]], 224.0, 0.8).is_err());
    }

    #[test]
    fn test_preprocess_layout() {
        let frame = Frame::from_pixel(448, 448, Rgba([255, 0, 51, 255]));
        let input = preprocess_nhwc(&frame, 224, 224);

        assert_eq!(input.len(), 224 * 224 * 3);
        assert_eq!(input[0], 1.0);
        assert_eq!(input[1], 0.0);
        assert!((input[2] - 0.2).abs() < 1e-6);
    }
}
