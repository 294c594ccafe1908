//! Action Dispatch
//!
//! Delivers debounced gaze actions to external sinks without blocking the
//! frame-processing loop:
//! - Scroll injection
//! - Chat history (selected phrase + time of day)
//! - Phrase dataset cycling on confirmed blinks

mod dataset;
mod dispatcher;
mod history;
mod sink;

pub use dataset::{DatasetCatalog, PhraseDataset};
pub use dispatcher::{
    ActionDispatcher, DispatchConfig, DispatchSinks, DispatchStats, DispatchSummary, Enqueue, ShutdownMode,
    ShutdownOutcome,
};
pub use history::{ChatEntry, ChatHistory};
pub use sink::{PhraseSource, ScrollSink, SelectionSink, TracingScrollSink};

use gaze_debounce::Cardinal;
use thiserror::Error;

/// Delivery failure reported by a sink
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    #[error("Sink unavailable: {0}")]
    Unavailable(String),

    #[error("No phrase for direction {0} in the current dataset")]
    Unresolved(Cardinal),

    #[error("Sink rejected action: {0}")]
    Rejected(String),
}

/// Dispatcher error types
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Backlog bound must be at least 1, got {0}")]
    InvalidBacklog(usize),

    #[error("Phrase catalog has no datasets")]
    EmptyCatalog,
}
