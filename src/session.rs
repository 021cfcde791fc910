//! Session lifecycle
//!
//! `Session` owns the board connection, the servo channels and the camera.
//! It has two states, stopped and running, and only changes state through
//! [`Session::start`] and [`Session::stop`].

use crate::actuator::{ActuatorError, Board, Connector, ServoChannel, SERVO_PINS};
use crate::camera::{CameraError, CameraProvider, Frame, FrameSource};
use crate::gesture::{ServoAngles, FINGER_COUNT};

/// Session state
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Stopped,
    Running,
}

/// Error type for session control
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("No serial port selected")]
    NoPort,
    #[error("Session is already running")]
    AlreadyRunning,
    #[error(transparent)]
    Actuator(#[from] ActuatorError),
    #[error(transparent)]
    Camera(#[from] CameraError),
}

/// Hardware assignment for a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Servo pins, channel 0 first
    pub servo_pins: [u8; FINGER_COUNT],
    pub camera_index: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            servo_pins: SERVO_PINS,
            camera_index: 0,
        }
    }
}

/// Owns the camera and board for one start/stop cycle
pub struct Session {
    connector: Box<dyn Connector>,
    cameras: Box<dyn CameraProvider>,
    config: SessionConfig,
    port: Option<String>,
    board: Option<Box<dyn Board>>,
    servos: Vec<ServoChannel>,
    camera: Option<Box<dyn FrameSource>>,
    running: bool,
}

impl Session {
    pub fn new(
        connector: Box<dyn Connector>,
        cameras: Box<dyn CameraProvider>,
        config: SessionConfig,
    ) -> Self {
        Self {
            connector,
            cameras,
            config,
            port: None,
            board: None,
            servos: Vec::new(),
            camera: None,
            running: false,
        }
    }

    /// Connect the board on `port`, attach the servos and open the camera.
    ///
    /// On failure everything opened so far is closed again and the session
    /// stays stopped.
    pub fn start(&mut self, port: &str) -> Result<(), SessionError> {
        if self.running {
            return Err(SessionError::AlreadyRunning);
        }
        if port.trim().is_empty() {
            return Err(SessionError::NoPort);
        }

        log::info!("Starting session on {}", port);
        let mut board = self.connector.connect(port)?;

        let mut servos = Vec::with_capacity(FINGER_COUNT);
        for (index, &pin) in self.config.servo_pins.iter().enumerate() {
            if let Err(e) = board.attach_servo(pin) {
                close_board(board.as_mut());
                return Err(e.into());
            }
            servos.push(ServoChannel { index, pin });
        }

        let camera = match self.cameras.open(self.config.camera_index) {
            Ok(camera) => camera,
            Err(e) => {
                log::error!("Camera failed to open, closing board: {}", e);
                close_board(board.as_mut());
                return Err(e.into());
            }
        };

        self.board = Some(board);
        self.servos = servos;
        self.camera = Some(camera);
        self.port = Some(port.to_string());
        self.running = true;

        log::info!("Session running on {}", port);
        Ok(())
    }

    /// Stop the session and release the board and camera.
    ///
    /// Safe to call when already stopped.
    pub fn stop(&mut self) {
        let was_running = self.running;
        self.running = false;

        if let Some(mut board) = self.board.take() {
            close_board(board.as_mut());
        }
        self.servos.clear();

        if let Some(mut camera) = self.camera.take() {
            camera.release();
        }

        if was_running {
            log::info!("Session stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn state(&self) -> SessionState {
        if self.running {
            SessionState::Running
        } else {
            SessionState::Stopped
        }
    }

    /// Port of the current or last session
    pub fn port(&self) -> Option<&str> {
        self.port.as_deref()
    }

    /// Servo channels, empty while stopped
    pub fn servos(&self) -> &[ServoChannel] {
        &self.servos
    }

    pub fn has_camera(&self) -> bool {
        self.camera.is_some()
    }

    pub fn has_board(&self) -> bool {
        self.board.is_some()
    }

    /// Read one frame from the camera, if it is open
    pub fn read_frame(&mut self) -> Option<Frame> {
        self.camera.as_mut()?.read_frame()
    }

    /// Send all five angles in channel order.
    ///
    /// Does nothing unless the session is running with every channel bound.
    pub fn write_angles(&mut self, angles: ServoAngles) -> Result<(), ActuatorError> {
        if !self.running || self.servos.len() != FINGER_COUNT {
            return Ok(());
        }
        let board = self.board.as_mut().ok_or(ActuatorError::Closed)?;

        for channel in &self.servos {
            let angle = angles.get(channel.index).unwrap_or(0);
            board.write_servo(channel.pin, angle)?;
        }
        Ok(())
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.stop();
    }
}

fn close_board(board: &mut dyn Board) {
    match board.close() {
        Ok(()) => log::info!("Board connection closed"),
        Err(e) => log::warn!("Failed to close board cleanly: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{BoardEvent, FakeCameras, FakeConnector};

    fn session(connector: &FakeConnector, cameras: &FakeCameras) -> Session {
        Session::new(
            Box::new(connector.clone()),
            Box::new(cameras.clone()),
            SessionConfig::default(),
        )
    }

    #[test]
    fn test_stop_fresh_session() {
        let connector = FakeConnector::default();
        let cameras = FakeCameras::default();
        let mut session = session(&connector, &cameras);

        session.stop();
        session.stop();
        assert_eq!(session.state(), SessionState::Stopped);
        assert!(!session.has_board());
        assert!(!session.has_camera());
        assert!(session.servos().is_empty());
        assert!(connector.events().is_empty());
    }

    #[test]
    fn test_start_binds_five_servos() {
        let connector = FakeConnector::default();
        let cameras = FakeCameras::default();
        let mut session = session(&connector, &cameras);

        session.start("/dev/ttyACM0").unwrap();
        assert_eq!(session.state(), SessionState::Running);
        assert_eq!(session.port(), Some("/dev/ttyACM0"));

        let pins: Vec<u8> = session.servos().iter().map(|s| s.pin).collect();
        assert_eq!(pins, vec![10, 9, 6, 5, 3]);
        let indices: Vec<usize> = session.servos().iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3, 4]);
        assert!(session.has_camera());
        assert_eq!(cameras.opened(), 1);
    }

    #[test]
    fn test_stop_releases_everything() {
        let connector = FakeConnector::default();
        let cameras = FakeCameras::default();
        let mut session = session(&connector, &cameras);

        session.start("COM3").unwrap();
        session.stop();

        assert!(!session.is_running());
        assert!(!session.has_board());
        assert!(!session.has_camera());
        assert!(session.servos().is_empty());
        assert_eq!(connector.events().last(), Some(&BoardEvent::Closed));
        assert_eq!(cameras.released(), 1);
    }

    #[test]
    fn test_connect_failure_propagates() {
        let connector = FakeConnector::failing();
        let cameras = FakeCameras::default();
        let mut session = session(&connector, &cameras);

        let err = session.start("COM9").unwrap_err();
        assert!(matches!(err, SessionError::Actuator(ActuatorError::Connect { .. })));
        assert!(!session.is_running());
        assert_eq!(cameras.opened(), 0);
    }

    #[test]
    fn test_camera_failure_closes_board() {
        let connector = FakeConnector::default();
        let cameras = FakeCameras::failing();
        let mut session = session(&connector, &cameras);

        let err = session.start("COM3").unwrap_err();
        assert!(matches!(err, SessionError::Camera(_)));
        assert!(!session.is_running());
        assert!(!session.has_board());
        assert!(session.servos().is_empty());
        assert_eq!(connector.events().last(), Some(&BoardEvent::Closed));
    }

    #[test]
    fn test_attach_failure_closes_board() {
        let connector = FakeConnector::failing_attach(6);
        let cameras = FakeCameras::default();
        let mut session = session(&connector, &cameras);

        let err = session.start("COM3").unwrap_err();
        assert!(matches!(err, SessionError::Actuator(ActuatorError::InvalidPin(6))));
        assert!(!session.is_running());
        assert!(!session.has_board());
        assert!(!session.has_camera());
        assert!(session.servos().is_empty());
        assert_eq!(cameras.opened(), 0);
        assert_eq!(
            connector.events(),
            vec![BoardEvent::Attached(10), BoardEvent::Attached(9), BoardEvent::Closed]
        );
    }

    #[test]
    fn test_start_rejects_blank_port_and_double_start() {
        let connector = FakeConnector::default();
        let cameras = FakeCameras::default();
        let mut session = session(&connector, &cameras);

        assert!(matches!(session.start(""), Err(SessionError::NoPort)));
        session.start("COM3").unwrap();
        assert!(matches!(session.start("COM3"), Err(SessionError::AlreadyRunning)));
    }

    #[test]
    fn test_writes_only_while_running() {
        let connector = FakeConnector::default();
        let cameras = FakeCameras::default();
        let mut session = session(&connector, &cameras);

        session.write_angles(ServoAngles::new([90; 5])).unwrap();
        assert!(connector.writes().is_empty());

        session.start("COM3").unwrap();
        session.write_angles(ServoAngles::new([90, 0, 0, 0, 0])).unwrap();
        assert_eq!(
            connector.writes(),
            vec![(10, 90), (9, 0), (6, 0), (5, 0), (3, 0)]
        );

        session.stop();
        session.write_angles(ServoAngles::new([90; 5])).unwrap();
        assert_eq!(connector.writes().len(), 5);
    }
}
