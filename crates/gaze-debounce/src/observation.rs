//! Per-frame observations produced by the eye-state estimator

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::event::ScrollAxis;

/// Gaze direction of a single eye
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Eye detected, looking at the neutral center
    Middle,
    Up,
    Down,
    Left,
    Right,
    /// No eye detected this frame
    #[default]
    Unknown,
}

impl Direction {
    /// Actionable direction, if any
    pub fn cardinal(self) -> Option<Cardinal> {
        match self {
            Self::Up => Some(Cardinal::Up),
            Self::Down => Some(Cardinal::Down),
            Self::Left => Some(Cardinal::Left),
            Self::Right => Some(Cardinal::Right),
            Self::Middle | Self::Unknown => None,
        }
    }

    /// Whether the estimator found the eye this frame
    pub fn is_detected(self) -> bool {
        self != Self::Unknown
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Middle => "middle",
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The four directions that can trigger an action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Cardinal {
    Up,
    Down,
    Left,
    Right,
}

impl Cardinal {
    /// Scroll axis and signed tick count (positive = up/right)
    pub fn scroll(self, ticks: i32) -> (ScrollAxis, i32) {
        match self {
            Self::Up => (ScrollAxis::Vertical, ticks),
            Self::Down => (ScrollAxis::Vertical, -ticks),
            Self::Right => (ScrollAxis::Horizontal, ticks),
            Self::Left => (ScrollAxis::Horizontal, -ticks),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Up => "up",
            Self::Down => "down",
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

impl From<Cardinal> for Direction {
    fn from(cardinal: Cardinal) -> Self {
        match cardinal {
            Cardinal::Up => Self::Up,
            Cardinal::Down => Self::Down,
            Cardinal::Left => Self::Left,
            Cardinal::Right => Self::Right,
        }
    }
}

impl fmt::Display for Cardinal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction pair for both eyes in one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EyeObservation {
    #[serde(default)]
    pub left: Direction,
    #[serde(default)]
    pub right: Direction,
}

impl EyeObservation {
    pub fn new(left: Direction, right: Direction) -> Self {
        Self { left, right }
    }

    /// Both eyes reporting the same direction
    pub fn both(direction: Direction) -> Self {
        Self::new(direction, direction)
    }

    /// Neither eye detected
    pub fn unknown() -> Self {
        Self::both(Direction::Unknown)
    }

    /// Whether either eye is missing
    pub fn has_dropout(&self) -> bool {
        !self.left.is_detected() || !self.right.is_detected()
    }
}

/// Eye closure in one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BlinkObservation {
    /// Eyes closed this frame
    #[serde(default)]
    pub closed: bool,
}

impl BlinkObservation {
    pub fn closed() -> Self {
        Self { closed: true }
    }

    pub fn open() -> Self {
        Self { closed: false }
    }
}

impl From<bool> for BlinkObservation {
    fn from(closed: bool) -> Self {
        Self { closed }
    }
}

/// Ordered estimator output for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FrameObservation {
    #[serde(flatten)]
    pub eyes: EyeObservation,
    #[serde(flatten)]
    pub blink: BlinkObservation,
}

impl FrameObservation {
    pub fn new(eyes: EyeObservation, blink: BlinkObservation) -> Self {
        Self { eyes, blink }
    }

    /// Open-eyed frame gazing in `direction` with both eyes
    pub fn gaze(direction: Direction) -> Self {
        Self::new(EyeObservation::both(direction), BlinkObservation::open())
    }

    /// Closed-eye frame; the estimator cannot see the irises
    pub fn eyes_closed() -> Self {
        Self::new(EyeObservation::unknown(), BlinkObservation::closed())
    }
}
