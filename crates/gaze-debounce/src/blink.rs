//! Blink hysteresis
//!
//! Closing latches on a single frame. Reopening is debounced: the latch only
//! returns to open, firing `BlinkConfirmed`, once the closed-frame ratio in
//! the window drops below `1 - sensitivity`.

use gaze_window::BoundedWindow;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{validate_sensitivity, DebounceConfig};
use crate::event::ActionEvent;
use crate::observation::BlinkObservation;
use crate::DebounceError;

/// Two-state eyelid latch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Latch {
    #[default]
    Open,
    Closed,
}

/// Latched blink detector producing `BlinkConfirmed` events
#[derive(Debug, Clone)]
pub struct BlinkHysteresis {
    window: BoundedWindow<bool>,
    latch: Latch,
    /// Blink sensitivity in [0, 1]
    sensitivity: f64,
}

impl BlinkHysteresis {
    pub fn new(capacity: usize, sensitivity: f64) -> Result<Self, DebounceError> {
        validate_sensitivity("blink", sensitivity)?;
        Ok(Self {
            window: BoundedWindow::new(capacity)?,
            latch: Latch::Open,
            sensitivity,
        })
    }

    pub fn from_config(config: &DebounceConfig) -> Result<Self, DebounceError> {
        Self::new(config.window_capacity, config.blink_sensitivity)
    }

    /// Feed one frame's eye closure
    pub fn observe(&mut self, blink: BlinkObservation) -> Option<ActionEvent> {
        self.window.push(blink.closed);

        if blink.closed {
            if self.latch == Latch::Open {
                debug!("Eyes closed, latch closed");
            }
            self.latch = Latch::Closed;
            return None;
        }

        if self.latch == Latch::Open {
            return None;
        }

        let closed_ratio = self.closed_ratio();
        if closed_ratio < self.min_close_ratio() {
            self.latch = Latch::Open;
            info!("Blink confirmed (closed ratio {:.2})", closed_ratio);
            Some(ActionEvent::BlinkConfirmed)
        } else {
            debug!(
                "Reopening not yet confirmed: closed ratio {:.2} >= {:.2}",
                closed_ratio,
                self.min_close_ratio()
            );
            None
        }
    }

    /// Closed frames over the current (possibly partial) window
    pub fn closed_ratio(&self) -> f64 {
        self.window.ratio_where(|closed| *closed).unwrap_or(0.0)
    }

    /// Ratio the window must drop below to confirm reopening
    pub fn min_close_ratio(&self) -> f64 {
        1.0 - self.sensitivity
    }

    /// Change sensitivity; takes effect on the next frame
    pub fn set_sensitivity(&mut self, sensitivity: f64) -> Result<(), DebounceError> {
        validate_sensitivity("blink", sensitivity)?;
        self.sensitivity = sensitivity;
        debug!("Blink sensitivity set to {}", sensitivity);
        Ok(())
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn latch(&self) -> Latch {
        self.latch
    }

    pub fn window(&self) -> &BoundedWindow<bool> {
        &self.window
    }

    /// Clear the window and reopen the latch
    pub fn reset(&mut self) {
        self.window.clear();
        self.latch = Latch::Open;
    }
}
