//! Debounce configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::DebounceError;

/// Direction debouncing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Windowed both-eye consensus with cooldown, fires `Select`
    #[default]
    MajorityVote,
    /// Consecutive identical frames, fires `Scroll`
    RunLength,
}

/// Debounce configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Direction strategy
    pub strategy: Strategy,

    /// Observations per window (frames)
    pub window_capacity: usize,

    /// Direction sensitivity in [0, 1], higher triggers more easily
    pub direction_sensitivity: f64,

    /// Blink sensitivity in [0, 1]
    pub blink_sensitivity: f64,

    /// Minimum time between two `Select` events (seconds)
    pub cooldown_seconds: f64,

    /// Consecutive matching frames before a scroll (run-length mode only)
    pub run_length_threshold: u32,

    /// Scroll magnitude per fired event
    pub scroll_ticks: i32,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::MajorityVote,
            window_capacity: 15,
            direction_sensitivity: 0.4,
            blink_sensitivity: 0.5,
            cooldown_seconds: 3.0,
            run_length_threshold: 10,
            scroll_ticks: 20,
        }
    }
}

impl DebounceConfig {
    /// Create strict config (near-unanimous agreement, longer runs)
    pub fn strict() -> Self {
        Self {
            direction_sensitivity: 0.2,
            blink_sensitivity: 0.3,
            cooldown_seconds: 5.0,
            run_length_threshold: 20,
            ..Default::default()
        }
    }

    /// Create lenient config (easier triggering, shorter cooldown)
    pub fn lenient() -> Self {
        Self {
            direction_sensitivity: 0.7,
            blink_sensitivity: 0.6,
            cooldown_seconds: 1.5,
            run_length_threshold: 5,
            ..Default::default()
        }
    }

    /// Reject configurations that cannot start a session
    pub fn validate(&self) -> Result<(), DebounceError> {
        if self.window_capacity < 1 {
            return Err(DebounceError::InvalidCapacity(self.window_capacity));
        }
        if !self.cooldown_seconds.is_finite() || self.cooldown_seconds < 0.0 {
            return Err(DebounceError::InvalidCooldown(self.cooldown_seconds));
        }
        validate_sensitivity("direction", self.direction_sensitivity)?;
        validate_sensitivity("blink", self.blink_sensitivity)?;
        if self.run_length_threshold < 1 {
            return Err(DebounceError::InvalidRunLength(self.run_length_threshold));
        }
        if self.scroll_ticks <= 0 {
            return Err(DebounceError::InvalidScrollTicks(self.scroll_ticks));
        }
        Ok(())
    }

    /// Cooldown as a duration (zero if the configured value is invalid)
    pub fn cooldown(&self) -> Duration {
        Duration::try_from_secs_f64(self.cooldown_seconds).unwrap_or_default()
    }
}

/// Check a sensitivity lies in [0, 1]
pub fn validate_sensitivity(field: &'static str, value: f64) -> Result<(), DebounceError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DebounceError::SensitivityOutOfRange { field, value })
    }
}

/// Minimum per-eye vote count for a window: `ceil(capacity * (1 - sensitivity))`
pub fn quorum(capacity: usize, sensitivity: f64) -> usize {
    let required = capacity as f64 * (1.0 - sensitivity);
    // Absorb float error so 10 * (1 - 0.7) is 3, not 4
    (required - 1e-9).ceil().max(0.0) as usize
}
