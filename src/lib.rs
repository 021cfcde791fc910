//! Hand Control - camera-driven robotic hand
//!
//! Captures camera input, detects a hand and its extended fingers, maps the
//! finger pattern to five servo angles and streams them to a Firmata board
//! over a serial port, while a window shows the live feed.

pub mod actuator;
pub mod app;
pub mod camera;
pub mod capture;
pub mod gesture;
pub mod ml;
pub mod ports;
pub mod session;
pub mod settings;

#[cfg(test)]
mod test_support;

pub use app::HandControlApp;
