//! Hand Control - Main Entry Point
//!
//! Loads settings, sets up the camera, hand detector and serial board
//! collaborators, and opens the control window.

use anyhow::Context;

use hand_control::app::{HandControlApp, VideoPanel};
use hand_control::camera::{self, NokhwaProvider};
use hand_control::capture::FrameLoop;
use hand_control::ml::{HandDetector, OnnxHandDetector, Passthrough};
use hand_control::session::Session;
use hand_control::settings::Settings;

const WINDOW_TITLE: &str = "Hand Control App";

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    log::info!("Hand Control v{}", env!("CARGO_PKG_VERSION"));

    let settings = Settings::load_or_default().context("Failed to load settings")?;
    let table = settings.angle_table().context("Invalid calibration")?;

    for info in camera::list_cameras() {
        log::info!("Camera {}: {}", info.index, info.name);
    }

    let detector: Box<dyn HandDetector> =
        match OnnxHandDetector::new(settings.model_dir.as_deref(), settings.detection_confidence) {
            Ok(detector) => Box::new(detector),
            Err(e) => {
                log::warn!("Hand detection disabled: {}", e);
                Box::new(Passthrough)
            }
        };

    let frame_loop = FrameLoop::new(detector, table)
        .with_interval(settings.frame_interval())
        .with_frame_size(settings.frame_width, settings.frame_height);
    let session = Session::new(
        Box::new(settings.connector()),
        Box::new(NokhwaProvider),
        settings.session_config(),
    );
    let video = VideoPanel::new(settings.frame_width, settings.frame_height);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 600.0])
            .with_title(WINDOW_TITLE),
        ..Default::default()
    };

    eframe::run_native(
        WINDOW_TITLE,
        native_options,
        Box::new(move |_cc| Box::new(HandControlApp::new(session, frame_loop, video))),
    )
    .map_err(|e| anyhow::anyhow!("Window error: {}", e))
}
