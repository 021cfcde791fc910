//! Fakes for the camera, detector and board used across unit tests

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::actuator::{ActuatorError, Board, Connector};
use crate::camera::{CameraError, CameraProvider, Frame, FrameSource};
use crate::capture::FrameSink;
use crate::gesture::FingerState;
use crate::ml::{DetectorError, HandDetector};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BoardEvent {
    Attached(u8),
    Write(u8, u8),
    Closed,
}

/// Connector whose boards record every call
#[derive(Clone, Default)]
pub struct FakeConnector {
    events: Rc<RefCell<Vec<BoardEvent>>>,
    fail: bool,
    /// Pin whose `attach_servo` fails
    fail_attach: Option<u8>,
    fail_writes: bool,
}

impl FakeConnector {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    /// Boards reject attaching a servo on `pin`
    pub fn failing_attach(pin: u8) -> Self {
        Self {
            fail_attach: Some(pin),
            ..Default::default()
        }
    }

    /// Boards reject every servo write
    pub fn failing_writes() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    pub fn events(&self) -> Vec<BoardEvent> {
        self.events.borrow().clone()
    }

    /// `(pin, angle)` for every servo write
    pub fn writes(&self) -> Vec<(u8, u8)> {
        self.events
            .borrow()
            .iter()
            .filter_map(|e| match e {
                BoardEvent::Write(pin, angle) => Some((*pin, *angle)),
                _ => None,
            })
            .collect()
    }
}

impl Connector for FakeConnector {
    fn connect(&self, port: &str) -> Result<Box<dyn Board>, ActuatorError> {
        if self.fail {
            return Err(ActuatorError::Connect {
                port: port.to_string(),
                reason: "no such device".to_string(),
            });
        }
        Ok(Box::new(FakeBoard {
            events: self.events.clone(),
            fail_attach: self.fail_attach,
            fail_writes: self.fail_writes,
        }))
    }
}

struct FakeBoard {
    events: Rc<RefCell<Vec<BoardEvent>>>,
    fail_attach: Option<u8>,
    fail_writes: bool,
}

impl Board for FakeBoard {
    fn attach_servo(&mut self, pin: u8) -> Result<(), ActuatorError> {
        if self.fail_attach == Some(pin) {
            return Err(ActuatorError::InvalidPin(pin));
        }
        self.events.borrow_mut().push(BoardEvent::Attached(pin));
        Ok(())
    }

    fn write_servo(&mut self, pin: u8, angle: u8) -> Result<(), ActuatorError> {
        if self.fail_writes {
            return Err(ActuatorError::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "write timed out",
            )));
        }
        self.events.borrow_mut().push(BoardEvent::Write(pin, angle));
        Ok(())
    }

    fn close(&mut self) -> Result<(), ActuatorError> {
        self.events.borrow_mut().push(BoardEvent::Closed);
        Ok(())
    }
}

#[derive(Default)]
struct CameraState {
    /// `None` entries simulate failed reads
    frames: VecDeque<Option<Frame>>,
    opened: usize,
    released: usize,
}

/// Camera provider serving queued frames
#[derive(Clone, Default)]
pub struct FakeCameras {
    state: Rc<RefCell<CameraState>>,
    fail: bool,
}

impl FakeCameras {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn push_frame(&self, frame: Option<Frame>) {
        self.state.borrow_mut().frames.push_back(frame);
    }

    pub fn opened(&self) -> usize {
        self.state.borrow().opened
    }

    pub fn released(&self) -> usize {
        self.state.borrow().released
    }
}

impl CameraProvider for FakeCameras {
    fn open(&self, index: u32) -> Result<Box<dyn FrameSource>, CameraError> {
        if self.fail {
            return Err(CameraError::Open {
                index,
                reason: "camera busy".to_string(),
            });
        }
        self.state.borrow_mut().opened += 1;
        Ok(Box::new(FakeCamera {
            state: self.state.clone(),
        }))
    }
}

struct FakeCamera {
    state: Rc<RefCell<CameraState>>,
}

impl FrameSource for FakeCamera {
    fn read_frame(&mut self) -> Option<Frame> {
        self.state.borrow_mut().frames.pop_front().flatten()
    }

    fn release(&mut self) {
        self.state.borrow_mut().released += 1;
    }
}

/// Detector returning scripted results, then no hand
#[derive(Default)]
pub struct ScriptedDetector {
    results: VecDeque<Result<Option<FingerState>, DetectorError>>,
}

impl ScriptedDetector {
    pub fn new(results: Vec<Result<Option<FingerState>, DetectorError>>) -> Self {
        Self {
            results: results.into(),
        }
    }
}

impl HandDetector for ScriptedDetector {
    fn find_hands(&mut self, _frame: &mut Frame) -> Result<Option<FingerState>, DetectorError> {
        self.results.pop_front().unwrap_or(Ok(None))
    }
}

/// Sink remembering presented frame sizes
#[derive(Default)]
pub struct RecordingSink {
    pub frames: Vec<(u32, u32)>,
}

impl FrameSink for RecordingSink {
    fn present(&mut self, frame: &Frame) {
        self.frames.push(frame.dimensions());
    }
}
