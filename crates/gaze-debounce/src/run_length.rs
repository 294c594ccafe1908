//! Run-length direction debouncer
//!
//! Counts consecutive frames in which both eyes agree on the same non-neutral
//! direction as the immediately previous frame. Any dropout or change resets
//! the run; reaching the threshold fires a scroll.

use tracing::{debug, info};

use crate::config::DebounceConfig;
use crate::event::ActionEvent;
use crate::observation::{Direction, EyeObservation};

/// Consecutive-frame debouncer producing `Scroll` events
#[derive(Debug, Clone)]
pub struct RunLengthDebouncer {
    /// Previous frame's pair, compared against the current one
    last_pair: Option<EyeObservation>,
    /// Consecutive matching frames
    run_length: u32,
    /// Frames required to fire
    threshold: u32,
    /// Scroll magnitude
    scroll_ticks: i32,
}

impl RunLengthDebouncer {
    pub fn new(threshold: u32, scroll_ticks: i32) -> Self {
        Self {
            last_pair: None,
            run_length: 0,
            threshold,
            scroll_ticks,
        }
    }

    pub fn from_config(config: &DebounceConfig) -> Self {
        Self::new(config.run_length_threshold, config.scroll_ticks)
    }

    /// Feed one frame's direction pair
    pub fn observe(&mut self, pair: EyeObservation) -> Option<ActionEvent> {
        // The pair is remembered on every frame, including ignored ones
        let previous = self.last_pair.replace(pair)?;

        if pair.has_dropout() {
            return None;
        }
        if pair.left == Direction::Middle && pair.right == Direction::Middle {
            return None;
        }

        if pair == previous && pair.left == pair.right {
            self.run_length += 1;
        } else {
            if self.run_length > 0 {
                debug!("Run of {} frames broken by {}/{}", self.run_length, pair.left, pair.right);
            }
            self.run_length = 0;
        }

        if self.run_length < self.threshold {
            return None;
        }

        self.run_length = 0;
        let direction = pair.left.cardinal()?;
        info!("Sustained gaze {} for {} frames, scrolling", direction, self.threshold);
        Some(ActionEvent::scroll(direction, self.scroll_ticks))
    }

    /// Current consecutive-frame count
    pub fn run_length(&self) -> u32 {
        self.run_length
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Forget the previous pair and the current run
    pub fn reset(&mut self) {
        self.last_pair = None;
        self.run_length = 0;
    }
}
