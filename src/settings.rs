//! Application settings
//!
//! Settings are read from an optional JSON file. Every field has a default,
//! so a missing file or a partial one behaves like the stock setup: camera 0,
//! 640x480 frames every 10 ms, servos on pins 10, 9, 6, 5, 3.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::actuator::firmata::DEFAULT_BAUD_RATE;
use crate::actuator::{SerialConnector, SERVO_PINS};
use crate::capture::{FRAME_HEIGHT, FRAME_WIDTH};
use crate::gesture::{
    AngleOutOfRange, AngleTable, FingerState, ParseFingerStateError, ServoAngles,
};
use crate::session::SessionConfig;

/// Environment variable naming a settings file
pub const SETTINGS_ENV: &str = "HAND_CONTROL_SETTINGS";
/// Settings file looked up in the working directory
pub const LOCAL_FILE: &str = "hand-control.json";

/// Settings errors
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Calibration entry {index}: {source}")]
    Pattern {
        index: usize,
        source: ParseFingerStateError,
    },
    #[error("Calibration entry {index}: {source}")]
    Angle {
        index: usize,
        source: AngleOutOfRange,
    },
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// One calibration row, e.g. `{ "fingers": "01000", "angles": [90, 0, 0, 0, 0] }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationEntry {
    pub fingers: String,
    pub angles: [u8; 5],
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Camera index passed to the capture backend
    pub camera_index: u32,
    /// Working resolution
    pub frame_width: u32,
    pub frame_height: u32,
    /// Delay between loop steps
    pub frame_interval_ms: u64,
    /// Minimum hand presence score (0-1)
    pub detection_confidence: f32,
    /// Directory containing hand_landmark.onnx
    pub model_dir: Option<PathBuf>,
    pub baud_rate: u32,
    /// Wait after opening the serial port while the board resets
    pub board_settle_ms: u64,
    /// Servo pins, channel 0 first
    pub servo_pins: [u8; 5],
    /// Replaces the built-in calibration when set
    pub calibration: Option<Vec<CalibrationEntry>>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            camera_index: 0,
            frame_width: FRAME_WIDTH,
            frame_height: FRAME_HEIGHT,
            frame_interval_ms: 10,
            detection_confidence: 0.8,
            model_dir: None,
            baud_rate: DEFAULT_BAUD_RATE,
            board_settle_ms: 2000,
            servo_pins: SERVO_PINS,
            calibration: None,
        }
    }
}

impl Settings {
    /// Load settings from a JSON file
    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let contents = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let settings = Self::from_json(&contents).map_err(|source| SettingsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Load from the first settings file found, or use defaults
    pub fn load_or_default() -> Result<Self, SettingsError> {
        match Self::locate() {
            Some(path) => {
                log::info!("Loading settings from {:?}", path);
                Self::load(&path)
            }
            None => {
                log::info!("No settings file found, using defaults");
                let settings = Self::default();
                settings.validate()?;
                Ok(settings)
            }
        }
    }

    /// Check values the loop cannot run with
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(SettingsError::Invalid(format!(
                "frame size {}x{} must be non-zero",
                self.frame_width, self.frame_height
            )));
        }
        if !(0.0..=1.0).contains(&self.detection_confidence) {
            return Err(SettingsError::Invalid(format!(
                "detection_confidence {} must be between 0 and 1",
                self.detection_confidence
            )));
        }
        Ok(())
    }

    /// Settings file location: `$HAND_CONTROL_SETTINGS`, then
    /// `hand-control.json` in the working directory, then the user config dir
    pub fn locate() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(SETTINGS_ENV) {
            return Some(PathBuf::from(path));
        }

        let local = PathBuf::from(LOCAL_FILE);
        if local.exists() {
            return Some(local);
        }

        dirs::config_dir()
            .map(|dir| dir.join("hand-control").join("settings.json"))
            .filter(|path| path.exists())
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            servo_pins: self.servo_pins,
            camera_index: self.camera_index,
        }
    }

    pub fn connector(&self) -> SerialConnector {
        SerialConnector {
            baud_rate: self.baud_rate,
            settle_time: Duration::from_millis(self.board_settle_ms),
            ..Default::default()
        }
    }

    /// The calibration override, or the built-in table
    pub fn angle_table(&self) -> Result<AngleTable, SettingsError> {
        let Some(entries) = &self.calibration else {
            return Ok(AngleTable::calibrated());
        };

        let mut rows = Vec::with_capacity(entries.len());
        for (index, entry) in entries.iter().enumerate() {
            let fingers: FingerState = entry
                .fingers
                .parse()
                .map_err(|source| SettingsError::Pattern { index, source })?;
            let angles = ServoAngles::try_new(entry.angles)
                .map_err(|source| SettingsError::Angle { index, source })?;
            rows.push((fingers, angles));
        }

        log::info!("Using calibration override with {} entries", rows.len());
        Ok(AngleTable::from_entries(rows))
    }
}
