//! Gaze Debouncing Engine
//!
//! Turns a jittery per-frame stream of eye observations into discrete,
//! rate-limited intent events:
//! - Majority-vote direction selection with cooldown (primary)
//! - Run-length direction scrolling (lightweight alternative)
//! - Blink confirmation with open/closed hysteresis

pub mod blink;
pub mod config;
pub mod engine;
pub mod event;
pub mod majority;
pub mod observation;
pub mod run_length;

pub use blink::{BlinkHysteresis, Latch};
pub use config::{quorum, DebounceConfig, Strategy};
pub use engine::{EngineStats, GestureEngine};
pub use event::{ActionEvent, ScrollAxis};
pub use majority::MajorityVoteDebouncer;
pub use observation::{BlinkObservation, Cardinal, Direction, EyeObservation, FrameObservation};
pub use run_length::RunLengthDebouncer;

use gaze_window::WindowError;
use thiserror::Error;

/// Debounce error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DebounceError {
    #[error("Window capacity must be at least 1, got {0}")]
    InvalidCapacity(usize),

    #[error("Cooldown must be a finite, non-negative number of seconds, got {0}")]
    InvalidCooldown(f64),

    #[error("{field} sensitivity {value} is out of range [0, 1]")]
    SensitivityOutOfRange { field: &'static str, value: f64 },

    #[error("Run-length threshold must be at least 1, got {0}")]
    InvalidRunLength(u32),

    #[error("Scroll ticks must be positive, got {0}")]
    InvalidScrollTicks(i32),

    #[error(transparent)]
    Window(#[from] WindowError),
}
