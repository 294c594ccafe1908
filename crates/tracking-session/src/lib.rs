//! Tracking Session
//!
//! Runs one gaze-tracking session: frames arrive in capture order over a
//! bounded channel (the producer waits when it is full), pass through the
//! gesture engine, and fired actions are handed to the dispatcher. Stopping
//! is an explicit signal answered with a report once everything has shut
//! down.

mod frames;
mod session;

pub use frames::FrameSender;
pub use session::{
    SessionConfig, SessionHandle, SessionReport, SessionSnapshot, StopReason, TrackingSession,
};

use action_dispatch::DispatchError;
use gaze_debounce::DebounceError;
use std::time::Duration;
use thiserror::Error;

/// Session error types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("Invalid debounce configuration: {0}")]
    Config(#[from] DebounceError),

    #[error("Dispatcher error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("Frame buffer must hold at least 1 frame, got {0}")]
    InvalidFrameBuffer(usize),

    #[error("Session stopped")]
    Stopped,

    #[error("Session did not stop within {0:?}")]
    StopTimeout(Duration),

    #[error("Session task failed: {0}")]
    Worker(String),
}
