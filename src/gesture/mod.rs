//! Finger states and servo angle vectors
//!
//! Both types are ordered thumb, index, middle, ring, pinky.

pub mod table;

use std::fmt;
use std::str::FromStr;

pub use table::{AngleTable, DuplicateKey};

/// Number of tracked fingers (and servo channels)
pub const FINGER_COUNT: usize = 5;

/// Highest angle the calibration uses
pub const MAX_ANGLE: u8 = 90;

/// A single finger, in table order
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; FINGER_COUNT] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// Landmark index of the fingertip in the 21-point hand model
    pub fn tip_landmark(&self) -> usize {
        match self {
            Finger::Thumb => 4,
            Finger::Index => 8,
            Finger::Middle => 12,
            Finger::Ring => 16,
            Finger::Pinky => 20,
        }
    }
}

/// Which fingers are extended
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct FingerState([bool; FINGER_COUNT]);

impl FingerState {
    pub const fn new(fingers: [bool; FINGER_COUNT]) -> Self {
        Self(fingers)
    }

    /// Build from 0/1 flags, any non-zero value counts as extended
    pub const fn from_flags(flags: [u8; FINGER_COUNT]) -> Self {
        Self([
            flags[0] != 0,
            flags[1] != 0,
            flags[2] != 0,
            flags[3] != 0,
            flags[4] != 0,
        ])
    }

    pub fn is_extended(&self, finger: Finger) -> bool {
        self.0[finger as usize]
    }

    /// Number of extended fingers
    pub fn extended_count(&self) -> usize {
        self.0.iter().filter(|&&up| up).count()
    }
}

impl fmt::Display for FingerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for up in self.0 {
            f.write_str(if up { "1" } else { "0" })?;
        }
        Ok(())
    }
}

/// Error parsing a finger pattern such as `"01000"`
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid finger pattern {0:?}, expected five 0/1 characters")]
pub struct ParseFingerStateError(pub String);

impl FromStr for FingerState {
    type Err = ParseFingerStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = s.trim().as_bytes();
        if bytes.len() != FINGER_COUNT {
            return Err(ParseFingerStateError(s.to_string()));
        }

        let mut fingers = [false; FINGER_COUNT];
        for (slot, byte) in fingers.iter_mut().zip(bytes) {
            *slot = match byte {
                b'0' => false,
                b'1' => true,
                _ => return Err(ParseFingerStateError(s.to_string())),
            };
        }
        Ok(Self(fingers))
    }
}

/// Commanded angle for each servo channel
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ServoAngles([u8; FINGER_COUNT]);

/// Angle outside the calibrated range
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("servo angle {angle} on channel {channel} exceeds {}", MAX_ANGLE)]
pub struct AngleOutOfRange {
    pub channel: usize,
    pub angle: u8,
}

impl ServoAngles {
    /// All servos at rest
    pub const NEUTRAL: ServoAngles = ServoAngles([0; FINGER_COUNT]);

    /// Unchecked constructor for compile-time tables
    pub const fn new(angles: [u8; FINGER_COUNT]) -> Self {
        Self(angles)
    }

    pub fn try_new(angles: [u8; FINGER_COUNT]) -> Result<Self, AngleOutOfRange> {
        for (channel, angle) in angles.into_iter().enumerate() {
            if angle > MAX_ANGLE {
                return Err(AngleOutOfRange { channel, angle });
            }
        }
        Ok(Self(angles))
    }

    pub fn get(&self, channel: usize) -> Option<u8> {
        self.0.get(channel).copied()
    }
}

impl fmt::Display for ServoAngles {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e] = self.0;
        write!(f, "({}, {}, {}, {}, {})", a, b, c, d, e)
    }
}
