//! Reference model of one session's lifecycle
//!
//! A plain value-level restatement of the lifecycle rules. The fuzzer
//! replays the same operations against the real engine and the model and
//! compares open paths, active flags and call control counts.
//!
//! Ends are counted per teardown episode: an episode begins with an open
//! or with any direction observed active, and a close that leaves both
//! directions inactive finishes it with exactly one end.

use vpcm_core::{Direction, TriggerEvent};

use crate::CallCounts;

/// One lifecycle operation on a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleOp {
    Open(Direction),
    Prepare(Direction),
    Trigger(Direction, TriggerEvent),
    Close(Direction),
}

impl LifecycleOp {
    pub fn direction(self) -> Direction {
        match self {
            LifecycleOp::Open(d)
            | LifecycleOp::Prepare(d)
            | LifecycleOp::Trigger(d, _)
            | LifecycleOp::Close(d) => d,
        }
    }
}

/// Expected state of one session
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionModel {
    pub playback_open: bool,
    pub capture_open: bool,
    pub playback_active: bool,
    pub capture_active: bool,
    pub counts: CallCounts,
    /// Opens since the last end
    opens_since_end: u32,
    /// Operations after which some direction was active, since the last end
    active_since_end: u32,
}

impl SessionModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self, direction: Direction) -> bool {
        match direction {
            Direction::Playback => self.playback_open,
            Direction::Capture => self.capture_open,
        }
    }

    pub fn open_count(&self) -> u8 {
        u8::from(self.playback_open) + u8::from(self.capture_open)
    }

    fn both_active(&self) -> bool {
        self.playback_active && self.capture_active
    }

    fn set_active(&mut self, direction: Direction, active: bool) {
        match direction {
            Direction::Playback => self.playback_active = active,
            Direction::Capture => self.capture_active = active,
        }
    }

    fn set_open(&mut self, direction: Direction, open: bool) {
        match direction {
            Direction::Playback => self.playback_open = open,
            Direction::Capture => self.capture_open = open,
        }
    }

    /// True on the rising edge of both-active
    fn raise(&mut self, direction: Direction) -> bool {
        let before = self.both_active();
        self.set_active(direction, true);
        !before && self.both_active()
    }

    /// Apply an operation. Operations on a direction that is not open are
    /// not applicable (there is no handle to issue them with) and return
    /// false, as does opening a direction that is already open.
    pub fn apply(&mut self, op: LifecycleOp) -> bool {
        let direction = op.direction();
        match op {
            LifecycleOp::Open(_) => {
                if self.is_open(direction) {
                    return false;
                }
                self.set_open(direction, true);
                self.opens_since_end = self.opens_since_end.saturating_add(1);
            }
            _ if !self.is_open(direction) => return false,
            LifecycleOp::Prepare(_) => {
                if self.raise(direction) {
                    self.counts.starts += 1;
                }
            }
            LifecycleOp::Trigger(_, event) if event.is_resume() => {
                if self.raise(direction) {
                    self.counts.resumes += 1;
                }
            }
            LifecycleOp::Trigger(_, event) if event.is_hold() => {
                self.set_active(direction, false);
                self.counts.standbys += 1;
            }
            LifecycleOp::Trigger(..) => {}
            LifecycleOp::Close(_) => {
                self.set_active(direction, false);
                self.set_open(direction, false);
                let episode_open = self.opens_since_end > 0 || self.active_since_end > 0;
                if !self.playback_active && !self.capture_active && episode_open {
                    self.opens_since_end = 0;
                    self.active_since_end = 0;
                    self.counts.ends += 1;
                }
            }
        }
        if self.playback_active || self.capture_active {
            self.active_since_end = self.active_since_end.saturating_add(1);
        }
        true
    }
}
