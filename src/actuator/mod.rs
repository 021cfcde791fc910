//! Servo board interface
//!
//! A [`Connector`] opens a [`Board`] on a serial port; the board attaches
//! servos to pins and accepts angle writes. The Firmata implementation lives
//! in [`firmata`].

pub mod firmata;

pub use firmata::{FirmataBoard, SerialConnector};

/// Default servo pins, channel 0 first
pub const SERVO_PINS: [u8; 5] = [10, 9, 6, 5, 3];

/// Error type for board communication
#[derive(Debug, thiserror::Error)]
pub enum ActuatorError {
    #[error("Failed to connect to board on {port}: {reason}")]
    Connect { port: String, reason: String },
    #[error("Pin {0} has no servo attached")]
    NoServo(u8),
    #[error("Pin {0} is out of range")]
    InvalidPin(u8),
    #[error("Board connection is closed")]
    Closed,
    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An open connection to a servo board
pub trait Board {
    /// Configure `pin` as a servo output
    fn attach_servo(&mut self, pin: u8) -> Result<(), ActuatorError>;

    /// Move the servo on `pin` to `angle` degrees
    fn write_servo(&mut self, pin: u8, angle: u8) -> Result<(), ActuatorError>;

    /// Release the servos and close the connection
    fn close(&mut self) -> Result<(), ActuatorError>;
}

/// Opens board connections by port name
pub trait Connector {
    fn connect(&self, port: &str) -> Result<Box<dyn Board>, ActuatorError>;
}

/// A servo output bound to a board pin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServoChannel {
    /// Position in the angle vector
    pub index: usize,
    /// Board pin
    pub pin: u8,
}
