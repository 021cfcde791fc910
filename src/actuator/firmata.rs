//! Firmata servo board over a serial port
//!
//! Only the host-to-board messages needed for servos are implemented:
//! servo configuration, pin mode changes and analog writes.

use std::collections::BTreeSet;
use std::io::Write;
use std::time::Duration;

use super::{ActuatorError, Board, Connector};

pub const START_SYSEX: u8 = 0xF0;
pub const END_SYSEX: u8 = 0xF7;
pub const ANALOG_MESSAGE: u8 = 0xE0;
pub const SET_PIN_MODE: u8 = 0xF4;
pub const SERVO_CONFIG: u8 = 0x70;
pub const EXTENDED_ANALOG: u8 = 0x6F;

pub const PIN_MODE_OUTPUT: u8 = 0x01;

/// Default servo pulse range in microseconds
pub const MIN_PULSE_US: u16 = 544;
pub const MAX_PULSE_US: u16 = 2400;

/// StandardFirmata baud rate
pub const DEFAULT_BAUD_RATE: u32 = 57_600;

/// Highest pin addressable by Firmata
const MAX_PIN: u8 = 127;
/// Highest servo angle accepted
const MAX_SERVO_ANGLE: u8 = 180;

/// Split a 14-bit value into two 7-bit bytes, LSB first
fn two_bytes(value: u16) -> [u8; 2] {
    [(value & 0x7F) as u8, ((value >> 7) & 0x7F) as u8]
}

/// SERVO_CONFIG sysex for `pin`
pub fn encode_servo_config(pin: u8, min_pulse: u16, max_pulse: u16) -> Vec<u8> {
    let mut msg = vec![START_SYSEX, SERVO_CONFIG, pin];
    msg.extend_from_slice(&two_bytes(min_pulse));
    msg.extend_from_slice(&two_bytes(max_pulse));
    msg.push(END_SYSEX);
    msg
}

/// SET_PIN_MODE message
pub fn encode_set_pin_mode(pin: u8, mode: u8) -> Vec<u8> {
    vec![SET_PIN_MODE, pin, mode]
}

/// Analog write, using EXTENDED_ANALOG for pins above 15
pub fn encode_analog_write(pin: u8, value: u16) -> Vec<u8> {
    let [lsb, msb] = two_bytes(value);
    if pin <= 15 {
        vec![ANALOG_MESSAGE | pin, lsb, msb]
    } else {
        vec![START_SYSEX, EXTENDED_ANALOG, pin, lsb, msb, END_SYSEX]
    }
}

/// Firmata board on any byte sink
pub struct FirmataBoard<W: Write> {
    port: Option<W>,
    servos: BTreeSet<u8>,
}

impl<W: Write> FirmataBoard<W> {
    pub fn new(port: W) -> Self {
        Self {
            port: Some(port),
            servos: BTreeSet::new(),
        }
    }

    /// Pins with an attached servo
    pub fn servo_pins(&self) -> impl Iterator<Item = u8> + '_ {
        self.servos.iter().copied()
    }

    /// Take the underlying writer back, if still open
    pub fn into_inner(mut self) -> Option<W> {
        self.port.take()
    }

    fn send(&mut self, msg: &[u8]) -> Result<(), ActuatorError> {
        let port = self.port.as_mut().ok_or(ActuatorError::Closed)?;
        port.write_all(msg)?;
        Ok(())
    }
}

impl<W: Write> Board for FirmataBoard<W> {
    fn attach_servo(&mut self, pin: u8) -> Result<(), ActuatorError> {
        if pin > MAX_PIN {
            return Err(ActuatorError::InvalidPin(pin));
        }
        self.send(&encode_servo_config(pin, MIN_PULSE_US, MAX_PULSE_US))?;
        self.servos.insert(pin);
        log::debug!("Servo attached on pin {}", pin);
        self.write_servo(pin, 0)
    }

    fn write_servo(&mut self, pin: u8, angle: u8) -> Result<(), ActuatorError> {
        if !self.servos.contains(&pin) {
            return Err(ActuatorError::NoServo(pin));
        }
        let angle = angle.min(MAX_SERVO_ANGLE);
        self.send(&encode_analog_write(pin, angle as u16))
    }

    fn close(&mut self) -> Result<(), ActuatorError> {
        if self.port.is_none() {
            return Ok(());
        }

        // Detach servos so the board stops driving them
        let pins: Vec<u8> = self.servos.iter().copied().collect();
        for pin in pins {
            self.send(&encode_set_pin_mode(pin, PIN_MODE_OUTPUT))?;
        }
        self.servos.clear();

        if let Some(mut port) = self.port.take() {
            port.flush()?;
        }
        Ok(())
    }
}

/// Connects to Firmata boards over serial ports
#[derive(Clone, Debug)]
pub struct SerialConnector {
    pub baud_rate: u32,
    /// Wait after opening while the board resets
    pub settle_time: Duration,
    pub write_timeout: Duration,
}

impl Default for SerialConnector {
    fn default() -> Self {
        Self {
            baud_rate: DEFAULT_BAUD_RATE,
            settle_time: Duration::from_secs(2),
            write_timeout: Duration::from_millis(500),
        }
    }
}

impl Connector for SerialConnector {
    fn connect(&self, port: &str) -> Result<Box<dyn Board>, ActuatorError> {
        log::info!("Connecting to board on {} at {} baud", port, self.baud_rate);

        let serial = serialport::new(port, self.baud_rate)
            .timeout(self.write_timeout)
            .open()
            .map_err(|e| ActuatorError::Connect {
                port: port.to_string(),
                reason: e.to_string(),
            })?;

        // Opening the port resets most Arduino boards
        std::thread::sleep(self.settle_time);

        log::info!("Board connected on {}", port);
        Ok(Box::new(FirmataBoard::new(serial)))
    }
}
