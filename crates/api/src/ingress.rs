//! Frame ingress
//!
//! Reads one JSON frame per line, e.g.
//! `{"left":"up","right":"up","closed":false}`, and forwards it to the
//! running session. A line that fails to parse becomes a frame with unknown
//! gaze that repeats the previous blink state, so the stream keeps its timing
//! without a spurious open or closed eye. Frames arriving with no running
//! session are dropped.

use gaze_debounce::{BlinkObservation, EyeObservation, FrameObservation};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, info};

use crate::SharedState;

/// Counters for one ingress run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngressStats {
    /// Frames accepted by a session
    pub frames: u64,
    /// Lines that did not parse
    pub malformed: u64,
    /// Frames dropped because no session was accepting
    pub idle_dropped: u64,
}

/// Parse one JSON frame line
pub fn parse_frame(line: &str) -> Result<FrameObservation, serde_json::Error> {
    serde_json::from_str(line)
}

/// Feed frames from `reader` until EOF, then end the session's stream
pub async fn feed_lines<R>(reader: R, state: SharedState) -> std::io::Result<IngressStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = IngressStats::default();
    let mut last_closed = false;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let frame = match parse_frame(line) {
            Ok(frame) => frame,
            Err(e) => {
                stats.malformed += 1;
                debug!("Malformed frame line ({}): {}", e, line);
                FrameObservation::new(EyeObservation::unknown(), BlinkObservation::from(last_closed))
            }
        };
        last_closed = frame.blink.closed;

        // Lock only long enough to clone the producer; sends may wait on backpressure
        let producer = state.read().await.producer();
        match producer {
            Some(mut producer) => match producer.send(frame).await {
                Ok(()) => stats.frames += 1,
                Err(_) => stats.idle_dropped += 1,
            },
            None => stats.idle_dropped += 1,
        }
    }

    state.write().await.end_stream();
    info!(
        "Frame source closed: frames={}, malformed={}, idle_dropped={}",
        stats.frames, stats.malformed, stats.idle_dropped
    );
    Ok(stats)
}
