//! Stream directions and lifecycle commands

use std::fmt;

/// Half-duplex path direction
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Render path (downlink audio to the user)
    Playback,
    /// Capture path (uplink audio from the user)
    Capture,
}

impl Direction {
    pub const BOTH: [Direction; 2] = [Direction::Playback, Direction::Capture];
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Playback => f.write_str("playback"),
            Direction::Capture => f.write_str("capture"),
        }
    }
}

/// Trigger command delivered by the stream framework
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum TriggerEvent {
    Stop = 0,
    Start = 1,
    PausePush = 3,
    PauseRelease = 4,
    Suspend = 5,
    Resume = 6,
}

impl TriggerEvent {
    /// Parse a raw trigger command
    pub fn from_raw(cmd: i32) -> Option<Self> {
        match cmd {
            0 => Some(TriggerEvent::Stop),
            1 => Some(TriggerEvent::Start),
            3 => Some(TriggerEvent::PausePush),
            4 => Some(TriggerEvent::PauseRelease),
            5 => Some(TriggerEvent::Suspend),
            6 => Some(TriggerEvent::Resume),
            _ => None,
        }
    }

    /// Resume and pause-release re-assert the path
    pub fn is_resume(self) -> bool {
        matches!(self, TriggerEvent::Resume | TriggerEvent::PauseRelease)
    }

    /// Suspend and pause-push put the call on standby
    pub fn is_hold(self) -> bool {
        matches!(self, TriggerEvent::Suspend | TriggerEvent::PausePush)
    }
}

/// Local call hold command
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum LchMode {
    Start = 1,
    Stop = 2,
}

impl LchMode {
    pub fn from_raw(mode: i32) -> Option<Self> {
        match mode {
            1 => Some(LchMode::Start),
            2 => Some(LchMode::Stop),
            _ => None,
        }
    }
}
