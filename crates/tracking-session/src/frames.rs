//! Producer side of the frame channel

use action_dispatch::ShutdownMode;
use gaze_debounce::FrameObservation;
use tokio::sync::{mpsc, watch};

use crate::SessionError;

/// Handle the eye-state estimator uses to submit frames.
///
/// Sends wait while the session's frame buffer is full. Dropping every
/// sender ends the stream; the session then finishes on its own.
#[derive(Debug, Clone)]
pub struct FrameSender {
    tx: mpsc::Sender<FrameObservation>,
    cancel: watch::Receiver<Option<ShutdownMode>>,
}

impl FrameSender {
    pub(crate) fn new(
        tx: mpsc::Sender<FrameObservation>,
        cancel: watch::Receiver<Option<ShutdownMode>>,
    ) -> Self {
        Self { tx, cancel }
    }

    /// Submit a frame, waiting for buffer space. Returns `Stopped` as soon as
    /// the session is cancelled, even while waiting.
    pub async fn send(&mut self, frame: FrameObservation) -> Result<(), SessionError> {
        if self.is_stopped() {
            return Err(SessionError::Stopped);
        }
        tokio::select! {
            biased;
            _ = self.cancel.changed() => Err(SessionError::Stopped),
            sent = self.tx.send(frame) => sent.map_err(|_| SessionError::Stopped),
        }
    }

    /// Whether the session has been told to stop or has finished
    pub fn is_stopped(&self) -> bool {
        self.cancel.borrow().is_some() || self.tx.is_closed()
    }
}
