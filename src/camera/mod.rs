//! Camera capture module
//!
//! Provides synchronous frame reads from a camera using the nokhwa crate.
//! The capture loop pulls one frame per step, so there is no capture thread.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{ApiBackend, CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

/// RGBA frame as delivered to the detector and the display
pub type Frame = RgbaImage;

/// Camera errors
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    #[error("Failed to open camera {index}: {reason}")]
    Open { index: u32, reason: String },
    #[error("Failed to start camera stream: {0}")]
    Stream(String),
}

/// A source of frames, open until released
pub trait FrameSource {
    /// Read the next frame, `None` if no frame is available right now
    fn read_frame(&mut self) -> Option<Frame>;

    /// Release the device
    fn release(&mut self);
}

/// Opens frame sources by camera index
pub trait CameraProvider {
    fn open(&self, index: u32) -> Result<Box<dyn FrameSource>, CameraError>;
}

/// Information about an available camera
#[derive(Clone, Debug)]
pub struct CameraInfo {
    /// Camera index
    pub index: u32,
    /// Camera name
    pub name: String,
}

/// List available cameras
pub fn list_cameras() -> Vec<CameraInfo> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(camera_list) => camera_list
            .iter()
            .enumerate()
            .map(|(idx, info)| CameraInfo {
                index: idx as u32,
                name: info.human_name().to_string(),
            })
            .collect(),
        Err(e) => {
            log::warn!("Failed to enumerate cameras: {:?}", e);
            Vec::new()
        }
    }
}

/// Mirror a frame horizontally and scale it to the working resolution
pub fn prepare_frame(frame: &Frame, width: u32, height: u32) -> Frame {
    let mirrored = imageops::flip_horizontal(frame);
    if mirrored.width() == width && mirrored.height() == height {
        return mirrored;
    }
    imageops::resize(&mirrored, width, height, FilterType::Triangle)
}

/// Camera provider backed by nokhwa
#[derive(Clone, Copy, Debug, Default)]
pub struct NokhwaProvider;

impl CameraProvider for NokhwaProvider {
    fn open(&self, index: u32) -> Result<Box<dyn FrameSource>, CameraError> {
        Ok(Box::new(NokhwaCamera::open(index)?))
    }
}

/// An open nokhwa camera stream
pub struct NokhwaCamera {
    camera: Option<Camera>,
}

impl NokhwaCamera {
    /// Open a camera, trying progressively looser format requests
    pub fn open(camera_index: u32) -> Result<Self, CameraError> {
        log::info!("Opening camera {}", camera_index);

        let index = CameraIndex::Index(camera_index);
        let attempts = [
            RequestedFormatType::HighestResolution(Resolution::new(640, 480)),
            RequestedFormatType::AbsoluteHighestResolution,
            RequestedFormatType::None,
        ];

        let mut last_error = String::new();
        let mut opened = None;
        for format_type in attempts {
            let requested = RequestedFormat::new::<RgbAFormat>(format_type);
            match Camera::new(index.clone(), requested) {
                Ok(c) => {
                    opened = Some(c);
                    break;
                }
                Err(e) => {
                    log::warn!("Camera {} rejected format request: {:?}", camera_index, e);
                    last_error = e.to_string();
                }
            }
        }

        let mut camera = opened.ok_or(CameraError::Open {
            index: camera_index,
            reason: last_error,
        })?;

        camera
            .open_stream()
            .map_err(|e| CameraError::Stream(e.to_string()))?;

        log::info!(
            "Camera opened: {} ({}x{})",
            camera.info().human_name(),
            camera.resolution().width(),
            camera.resolution().height()
        );

        Ok(Self {
            camera: Some(camera),
        })
    }
}

impl FrameSource for NokhwaCamera {
    fn read_frame(&mut self) -> Option<Frame> {
        let camera = self.camera.as_mut()?;

        let buffer = match camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                log::debug!("Failed to capture frame: {:?}", e);
                return None;
            }
        };

        let width = buffer.resolution().width();
        let height = buffer.resolution().height();
        match buffer.decode_image::<RgbAFormat>() {
            Ok(image) => Frame::from_raw(width, height, image.into_raw()),
            Err(e) => {
                log::debug!("Failed to decode frame: {:?}", e);
                None
            }
        }
    }

    fn release(&mut self) {
        if let Some(mut camera) = self.camera.take() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("Failed to stop camera stream: {:?}", e);
            }
            log::info!("Camera released");
        }
    }
}

impl Drop for NokhwaCamera {
    fn drop(&mut self) {
        self.release();
    }
}
