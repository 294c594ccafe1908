//! External sink seams

use gaze_debounce::{Cardinal, ScrollAxis};
use tracing::info;

use crate::SinkError;

/// Scroll-injection sink (positive ticks = up/right)
pub trait ScrollSink: Send + Sync {
    fn scroll(&self, axis: ScrollAxis, ticks: i32) -> Result<(), SinkError>;
}

/// Receives selected phrase text with an `HH:MM:SS` timestamp
pub trait SelectionSink: Send + Sync {
    fn append(&self, text: String, timestamp: String) -> Result<(), SinkError>;
}

/// Externally owned phrase lookup with a cyclic current dataset
pub trait PhraseSource: Send + Sync {
    /// Phrase for a direction in the current dataset
    fn resolve(&self, direction: Cardinal) -> Option<String>;

    /// Move to the next dataset, wrapping at the end
    fn advance(&self) -> Result<(), SinkError>;
}

/// Scroll sink that only logs; stands in where no injection backend exists
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingScrollSink;

impl ScrollSink for TracingScrollSink {
    fn scroll(&self, axis: ScrollAxis, ticks: i32) -> Result<(), SinkError> {
        info!(target: "scroll", "Scroll {:?} by {} ticks", axis, ticks);
        Ok(())
    }
}
