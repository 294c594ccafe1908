//! Bounded Observation Window
//!
//! Provides a fixed-capacity sliding window with majority voting, used by the
//! debouncers to judge consensus over the last N per-frame observations.

mod window;

pub use window::BoundedWindow;

use thiserror::Error;

/// Window construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WindowError {
    /// Capacity must hold at least one observation
    #[error("Window capacity must be at least 1, got {0}")]
    ZeroCapacity(usize),
}
