//! Capture/render loop
//!
//! [`FrameLoop::step`] processes exactly one frame and returns a [`Tick`]
//! saying whether to run again. The window drives it from repaint callbacks
//! through a [`StepTimer`]; [`run_headless`] drives it with plain sleeps.

use std::time::{Duration, Instant};

use crate::camera::{prepare_frame, Frame};
use crate::gesture::AngleTable;
use crate::ml::HandDetector;
use crate::session::Session;

/// Default delay between steps
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(10);

/// Working resolution
pub const FRAME_WIDTH: u32 = 640;
pub const FRAME_HEIGHT: u32 = 480;

/// Receives the frame to display after each step
pub trait FrameSink {
    fn present(&mut self, frame: &Frame);
}

/// What the driver should do after a step
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Tick {
    /// Run the next step after this delay
    Continue(Duration),
    /// The session stopped; do not schedule again
    Halt,
}

/// Loop counters
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoopStats {
    /// Frames read and displayed
    pub frames: u64,
    /// Steps where no frame was available
    pub skipped: u64,
    /// Frames with a detected hand
    pub hands: u64,
    pub detector_errors: u64,
    pub write_errors: u64,
}

/// One-frame-per-step control loop
pub struct FrameLoop {
    detector: Box<dyn HandDetector>,
    table: AngleTable,
    interval: Duration,
    frame_size: (u32, u32),
    stats: LoopStats,
}

impl FrameLoop {
    pub fn new(detector: Box<dyn HandDetector>, table: AngleTable) -> Self {
        Self {
            detector,
            table,
            interval: DEFAULT_INTERVAL,
            frame_size: (FRAME_WIDTH, FRAME_HEIGHT),
            stats: LoopStats::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_size = (width, height);
        self
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats = LoopStats::default();
    }

    /// Process one frame.
    ///
    /// A missing frame or a detector failure skips the rest of the step; the
    /// loop keeps going as long as the session runs.
    pub fn step(&mut self, session: &mut Session, sink: &mut dyn FrameSink) -> Tick {
        if session.is_running() {
            self.process_frame(session, sink);
        }

        if session.is_running() {
            Tick::Continue(self.interval)
        } else {
            Tick::Halt
        }
    }

    fn process_frame(&mut self, session: &mut Session, sink: &mut dyn FrameSink) {
        let Some(raw) = session.read_frame() else {
            self.stats.skipped += 1;
            return;
        };

        let (width, height) = self.frame_size;
        let mut frame = prepare_frame(&raw, width, height);

        match self.detector.find_hands(&mut frame) {
            Ok(Some(fingers)) => {
                self.stats.hands += 1;
                let angles = self.table.lookup(fingers);
                log::debug!("Fingers {} -> angles {}", fingers, angles);

                if let Err(e) = session.write_angles(angles) {
                    self.stats.write_errors += 1;
                    log::warn!("Failed to write servo angles: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => {
                self.stats.detector_errors += 1;
                log::debug!("Hand detection failed: {}", e);
            }
        }

        sink.present(&frame);
        self.stats.frames += 1;
    }
}

/// Tracks when the next step is due
#[derive(Clone, Copy, Debug, Default)]
pub struct StepTimer {
    next_due: Option<Instant>,
}

impl StepTimer {
    /// Make a step due immediately
    pub fn arm(&mut self, now: Instant) {
        self.next_due = Some(now);
    }

    /// Drop any pending step
    pub fn cancel(&mut self) {
        self.next_due = None;
    }

    pub fn is_armed(&self) -> bool {
        self.next_due.is_some()
    }

    /// True if a step is scheduled and due at `now`
    pub fn is_due(&self, now: Instant) -> bool {
        self.next_due.is_some_and(|due| now >= due)
    }

    /// Time left until the next step, if one is scheduled
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.next_due.map(|due| due.saturating_duration_since(now))
    }

    /// Schedule from the outcome of a step
    pub fn schedule(&mut self, tick: Tick, now: Instant) {
        self.next_due = match tick {
            Tick::Continue(delay) => Some(now + delay),
            Tick::Halt => None,
        };
    }
}

/// Drive the loop without a window until the session stops.
///
/// `max_steps` bounds the number of steps; returns the number run.
pub fn run_headless(
    frame_loop: &mut FrameLoop,
    session: &mut Session,
    sink: &mut dyn FrameSink,
    max_steps: Option<usize>,
) -> usize {
    let mut steps = 0;
    while max_steps.map_or(true, |max| steps < max) {
        let tick = frame_loop.step(session, sink);
        steps += 1;
        match tick {
            Tick::Continue(delay) => std::thread::sleep(delay),
            Tick::Halt => break,
        }
    }
    steps
}
