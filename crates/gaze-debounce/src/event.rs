//! Debounced intent events

use serde::{Deserialize, Serialize};

use crate::observation::Cardinal;

/// Scroll axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScrollAxis {
    Vertical,
    Horizontal,
}

/// Action fired by the engine, at most one per processed frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ActionEvent {
    /// Scroll by signed ticks (positive = up/right)
    Scroll { axis: ScrollAxis, ticks: i32 },

    /// Select the menu entry in a direction
    Select { direction: Cardinal },

    /// Sustained blink ended
    BlinkConfirmed,
}

impl ActionEvent {
    /// Scroll event for a sustained gaze direction
    pub fn scroll(direction: Cardinal, ticks: i32) -> Self {
        let (axis, ticks) = direction.scroll(ticks);
        Self::Scroll { axis, ticks }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Scroll { .. } => "scroll",
            Self::Select { .. } => "select",
            Self::BlinkConfirmed => "blink_confirmed",
        }
    }
}
