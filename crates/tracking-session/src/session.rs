//! Session lifecycle and frame-processing loop

use action_dispatch::{ActionDispatcher, DispatchConfig, DispatchSinks, DispatchSummary, Enqueue, ShutdownMode};
use chrono::{DateTime, Utc};
use gaze_debounce::{DebounceConfig, DebounceError, EngineStats, FrameObservation, GestureEngine, Latch, Strategy};
use metrics::counter;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::frames::FrameSender;
use crate::SessionError;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Frames buffered between estimator and engine before the producer waits
    pub frame_buffer: usize,
    /// Bound on the ordered shutdown (milliseconds)
    pub stop_timeout_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            frame_buffer: 32,
            stop_timeout_ms: 1000,
        }
    }
}

/// Why the loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Stop requested through the handle
    Cancelled,
    /// Estimator went away
    EndOfStream,
}

/// Live view of a running session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub strategy: Strategy,
    pub direction_sensitivity: f64,
    pub blink_sensitivity: f64,
    pub blink_latch: Latch,
    pub engine: EngineStats,
    pub pending_actions: usize,
}

/// Acknowledgement returned once a session has fully shut down
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionReport {
    pub id: Uuid,
    pub started_at: DateTime<Utc>,
    pub stopped_at: DateTime<Utc>,
    pub reason: StopReason,
    pub engine: EngineStats,
    /// In-flight frames dropped by a discarding stop
    pub frames_discarded: u64,
    /// Dispatcher counters, including whether its drain timed out
    pub dispatch: DispatchSummary,
}

enum SessionCommand {
    Reset(oneshot::Sender<()>),
    DirectionSensitivity(f64, oneshot::Sender<Result<(), DebounceError>>),
    BlinkSensitivity(f64, oneshot::Sender<Result<(), DebounceError>>),
}

/// Everything owned by one session, moved into the loop at start
struct SessionState {
    id: Uuid,
    started_at: DateTime<Utc>,
    engine: GestureEngine,
    dispatcher: ActionDispatcher,
    frames_discarded: u64,
}

impl SessionState {
    fn process(&mut self, frame: FrameObservation) {
        let now = tokio::time::Instant::now().into_std();
        counter!("gaze_frames_processed_total").increment(1);

        if let Some(event) = self.engine.process(frame, now) {
            counter!("gaze_actions_fired_total", "kind" => event.kind()).increment(1);
            if let Enqueue::Displaced(old) = self.dispatcher.dispatch(event) {
                debug!("Dispatcher displaced {:?} for {:?}", old, event);
            }
        }
    }

    /// Apply a command, publish the new state, then acknowledge
    fn handle(&mut self, command: SessionCommand, snapshot: &watch::Sender<SessionSnapshot>) {
        match command {
            SessionCommand::Reset(reply) => {
                self.engine.reset();
                snapshot.send_replace(self.snapshot());
                let _ = reply.send(());
            }
            SessionCommand::DirectionSensitivity(value, reply) => {
                let result = self.engine.set_direction_sensitivity(value);
                snapshot.send_replace(self.snapshot());
                let _ = reply.send(result);
            }
            SessionCommand::BlinkSensitivity(value, reply) => {
                let result = self.engine.set_blink_sensitivity(value);
                snapshot.send_replace(self.snapshot());
                let _ = reply.send(result);
            }
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        let config = self.engine.config();
        SessionSnapshot {
            strategy: config.strategy,
            direction_sensitivity: config.direction_sensitivity,
            blink_sensitivity: config.blink_sensitivity,
            blink_latch: self.engine.blink_latch(),
            engine: self.engine.stats(),
            pending_actions: self.dispatcher.pending(),
        }
    }
}

/// Session factory
pub struct TrackingSession;

impl TrackingSession {
    /// Validate configuration, spawn the dispatcher and the processing loop.
    ///
    /// Must be called from within a tokio runtime. Returns the control handle
    /// and the producer handle for the estimator.
    pub fn start(
        debounce: DebounceConfig,
        dispatch: &DispatchConfig,
        session: &SessionConfig,
        sinks: DispatchSinks,
    ) -> Result<(SessionHandle, FrameSender), SessionError> {
        if session.frame_buffer < 1 {
            return Err(SessionError::InvalidFrameBuffer(session.frame_buffer));
        }
        dispatch.validate()?;
        let engine = GestureEngine::new(debounce)?;
        let dispatcher = ActionDispatcher::spawn(dispatch, sinks)?;

        let state = SessionState {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            engine,
            dispatcher,
            frames_discarded: 0,
        };
        let id = state.id;
        let started_at = state.started_at;

        let (frame_tx, frame_rx) = mpsc::channel(session.frame_buffer);
        let (command_tx, command_rx) = mpsc::channel(8);
        let (cancel_tx, cancel_rx) = watch::channel(None);
        let (snapshot_tx, snapshot_rx) = watch::channel(state.snapshot());

        let producer = FrameSender::new(frame_tx, cancel_tx.subscribe());
        let task = tokio::spawn(run_session(state, frame_rx, command_rx, cancel_rx, snapshot_tx));

        info!("Tracking session {} started", id);
        let handle = SessionHandle {
            id,
            started_at,
            cancel: cancel_tx,
            commands: command_tx,
            snapshot: snapshot_rx,
            task: Some(task),
            stop_timeout: Duration::from_millis(session.stop_timeout_ms),
        };
        Ok((handle, producer))
    }
}

/// Control handle for a running session
pub struct SessionHandle {
    id: Uuid,
    started_at: DateTime<Utc>,
    cancel: watch::Sender<Option<ShutdownMode>>,
    commands: mpsc::Sender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<SessionReport>>,
    stop_timeout: Duration,
}

impl SessionHandle {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Latest state published by the loop
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Whether the loop has exited (stopped or end of stream)
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Recalibrate: clear windows, counters, and latches
    pub async fn reset(&self) -> Result<(), SessionError> {
        let (reply, ack) = oneshot::channel();
        self.send_command(SessionCommand::Reset(reply)).await?;
        ack.await.map_err(|_| SessionError::Stopped)
    }

    pub async fn set_direction_sensitivity(&self, value: f64) -> Result<(), SessionError> {
        let (reply, ack) = oneshot::channel();
        self.send_command(SessionCommand::DirectionSensitivity(value, reply))
            .await?;
        Ok(ack.await.map_err(|_| SessionError::Stopped)??)
    }

    pub async fn set_blink_sensitivity(&self, value: f64) -> Result<(), SessionError> {
        let (reply, ack) = oneshot::channel();
        self.send_command(SessionCommand::BlinkSensitivity(value, reply))
            .await?;
        Ok(ack.await.map_err(|_| SessionError::Stopped)??)
    }

    async fn send_command(&self, command: SessionCommand) -> Result<(), SessionError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| SessionError::Stopped)
    }

    /// Signal the loop to stop and wait, bounded, for its acknowledgement
    pub async fn stop(mut self, mode: ShutdownMode) -> Result<SessionReport, SessionError> {
        info!("Stopping tracking session {} ({:?})", self.id, mode);
        // Loop may already have ended on its own
        let _ = self.cancel.send(Some(mode));

        let Some(mut task) = self.task.take() else {
            return Err(SessionError::Stopped);
        };
        match tokio::time::timeout(self.stop_timeout, &mut task).await {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => Err(SessionError::Worker(e.to_string())),
            Err(_) => {
                task.abort();
                warn!("Session {} did not stop within {:?}", self.id, self.stop_timeout);
                Err(SessionError::StopTimeout(self.stop_timeout))
            }
        }
    }
}

impl Drop for SessionHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            // Abandoned session: let the loop discard and exit on its own
            let _ = self.cancel.send(Some(ShutdownMode::Discard));
            drop(task);
        }
    }
}

async fn run_session(
    mut state: SessionState,
    mut frames: mpsc::Receiver<FrameObservation>,
    mut commands: mpsc::Receiver<SessionCommand>,
    mut cancel: watch::Receiver<Option<ShutdownMode>>,
    snapshot: watch::Sender<SessionSnapshot>,
) -> SessionReport {
    let (reason, mode) = loop {
        tokio::select! {
            biased;
            changed = cancel.changed() => {
                let mode = match changed {
                    Ok(()) => cancel.borrow().unwrap_or_default(),
                    Err(_) => ShutdownMode::Discard,
                };
                break (StopReason::Cancelled, mode);
            }
            Some(command) = commands.recv() => {
                state.handle(command, &snapshot);
            }
            frame = frames.recv() => match frame {
                Some(frame) => {
                    state.process(frame);
                    snapshot.send_replace(state.snapshot());
                }
                None => {
                    info!("Frame stream ended for session {}", state.id);
                    break (StopReason::EndOfStream, ShutdownMode::Drain);
                }
            },
        }
    };

    // No more live commands; callers see `Stopped` during the drain
    drop(commands);

    // Stop intake, then drain or discard what the estimator already queued
    frames.close();
    while let Ok(frame) = frames.try_recv() {
        match mode {
            ShutdownMode::Drain => state.process(frame),
            ShutdownMode::Discard => state.frames_discarded += 1,
        }
    }
    snapshot.send_replace(state.snapshot());

    let dispatch = state.dispatcher.shutdown(mode).await;
    let report = SessionReport {
        id: state.id,
        started_at: state.started_at,
        stopped_at: Utc::now(),
        reason,
        engine: state.engine.stats(),
        frames_discarded: state.frames_discarded,
        dispatch,
    };
    info!(
        "Tracking session {} stopped ({:?}): frames={}, events={}",
        report.id, report.reason, report.engine.frames_processed, report.engine.events_emitted
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use action_dispatch::{ChatHistory, DatasetCatalog, ScrollSink, ShutdownOutcome, SinkError, TracingScrollSink};
    use gaze_debounce::{Direction, ScrollAxis};
    use std::sync::Arc;
    use std::time::Instant;

    /// Scroll sink that blocks its caller, like a real input injector can
    struct SlowScroll(Duration);

    impl ScrollSink for SlowScroll {
        fn scroll(&self, _axis: ScrollAxis, _ticks: i32) -> Result<(), SinkError> {
            std::thread::sleep(self.0);
            Ok(())
        }
    }

    fn start_scrolling(
        history: &Arc<ChatHistory>,
        delay: Duration,
        dispatch: DispatchConfig,
    ) -> (SessionHandle, FrameSender) {
        TrackingSession::start(
            DebounceConfig {
                strategy: Strategy::RunLength,
                run_length_threshold: 1,
                ..Default::default()
            },
            &dispatch,
            &SessionConfig {
                frame_buffer: 1,
                ..Default::default()
            },
            DispatchSinks {
                scroll: Arc::new(SlowScroll(delay)),
                ..sinks(history)
            },
        )
        .unwrap()
    }

    fn sinks(history: &Arc<ChatHistory>) -> DispatchSinks {
        DispatchSinks {
            scroll: Arc::new(TracingScrollSink),
            selection: history.clone(),
            phrases: Arc::new(DatasetCatalog::default()),
        }
    }

    fn start(history: &Arc<ChatHistory>) -> (SessionHandle, FrameSender) {
        TrackingSession::start(
            DebounceConfig {
                window_capacity: 10,
                direction_sensitivity: 0.5,
                ..Default::default()
            },
            &DispatchConfig::default(),
            &SessionConfig::default(),
            sinks(history),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_rejects_invalid_config_before_start() {
        let history = Arc::new(ChatHistory::default());
        let result = TrackingSession::start(
            DebounceConfig {
                cooldown_seconds: -1.0,
                ..Default::default()
            },
            &DispatchConfig::default(),
            &SessionConfig::default(),
            sinks(&history),
        );
        assert!(matches!(
            result.err(),
            Some(SessionError::Config(DebounceError::InvalidCooldown(_)))
        ));

        let result = TrackingSession::start(
            DebounceConfig::default(),
            &DispatchConfig::default(),
            &SessionConfig {
                frame_buffer: 0,
                ..Default::default()
            },
            sinks(&history),
        );
        assert!(matches!(result.err(), Some(SessionError::InvalidFrameBuffer(0))));
    }

    #[tokio::test]
    async fn test_end_of_stream_delivers_and_reports() {
        let history = Arc::new(ChatHistory::default());
        let (handle, mut producer) = start(&history);

        for _ in 0..6 {
            producer.send(FrameObservation::gaze(Direction::Right)).await.unwrap();
        }
        for _ in 0..4 {
            producer.send(FrameObservation::gaze(Direction::Middle)).await.unwrap();
        }
        drop(producer);

        let report = handle.stop(ShutdownMode::Drain).await.unwrap();
        assert_eq!(report.engine.frames_processed, 10);
        assert_eq!(report.engine.selects, 1);
        assert_eq!(report.dispatch.stats.delivered, 1);
        assert_eq!(report.dispatch.outcome, ShutdownOutcome::Completed);
        assert_eq!(history.entries()[0].text, "Thank you");
    }

    #[tokio::test]
    async fn test_stop_is_observed_by_producer() {
        let history = Arc::new(ChatHistory::default());
        let (handle, mut producer) = start(&history);

        producer.send(FrameObservation::gaze(Direction::Up)).await.unwrap();
        let report = handle.stop(ShutdownMode::Discard).await.unwrap();

        assert_eq!(report.reason, StopReason::Cancelled);
        assert!(producer.is_stopped());
        assert_eq!(
            producer.send(FrameObservation::gaze(Direction::Up)).await,
            Err(SessionError::Stopped)
        );
    }

    #[tokio::test]
    async fn test_discard_stop_drops_in_flight_frames() {
        let history = Arc::new(ChatHistory::default());
        let (handle, mut producer) = start(&history);

        // Current-thread runtime: frames sit in the channel until we yield
        for _ in 0..10 {
            producer.send(FrameObservation::gaze(Direction::Up)).await.unwrap();
        }
        let report = handle.stop(ShutdownMode::Discard).await.unwrap();

        assert_eq!(report.engine.frames_processed + report.frames_discarded, 10);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_live_commands() {
        let history = Arc::new(ChatHistory::default());
        let (handle, mut producer) = start(&history);

        handle.set_direction_sensitivity(0.9).await.unwrap();
        handle.set_blink_sensitivity(0.2).await.unwrap();
        assert!(matches!(
            handle.set_blink_sensitivity(1.2).await,
            Err(SessionError::Config(DebounceError::SensitivityOutOfRange { .. }))
        ));

        producer.send(FrameObservation::eyes_closed()).await.unwrap();
        while handle.snapshot().engine.frames_processed == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(handle.snapshot().blink_latch, Latch::Closed);
        handle.reset().await.unwrap();

        let snapshot = handle.snapshot();
        assert_eq!(snapshot.direction_sensitivity, 0.9);
        assert_eq!(snapshot.blink_sensitivity, 0.2);
        assert_eq!(snapshot.blink_latch, Latch::Open);
        assert_eq!(snapshot.engine.frames_processed, 0);

        drop(producer);
        handle.stop(ShutdownMode::Drain).await.unwrap();
    }

    #[tokio::test]
    async fn test_restart_begins_from_cleared_state() {
        let history = Arc::new(ChatHistory::default());

        let (handle, mut producer) = start(&history);
        for _ in 0..9 {
            producer.send(FrameObservation::gaze(Direction::Left)).await.unwrap();
        }
        let first = handle.stop(ShutdownMode::Drain).await.unwrap();
        assert_eq!(first.engine.selects, 0);

        // One more frame would have completed the old window
        let (handle, mut producer) = start(&history);
        producer.send(FrameObservation::gaze(Direction::Left)).await.unwrap();
        drop(producer);
        let second = handle.stop(ShutdownMode::Drain).await.unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(second.engine.frames_processed, 1);
        assert_eq!(second.engine.selects, 0);
        assert!(history.is_empty());
    }

    #[tokio::test]
    async fn test_slow_scroll_sink_does_not_hold_back_frames() {
        let history = Arc::new(ChatHistory::default());
        let dispatch = DispatchConfig {
            shutdown_timeout_ms: 2000,
            ..Default::default()
        };
        let (handle, mut producer) = start_scrolling(&history, Duration::from_millis(400), dispatch);

        // Every frame after the first fires a scroll into the slow sink
        let started = Instant::now();
        for _ in 0..5 {
            producer.send(FrameObservation::gaze(Direction::Up)).await.unwrap();
        }
        assert!(started.elapsed() < Duration::from_millis(300));

        let report = handle.stop(ShutdownMode::Discard).await.unwrap();
        assert_eq!(report.reason, StopReason::Cancelled);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_dispatch_timeout_still_produces_report() {
        let history = Arc::new(ChatHistory::default());
        let dispatch = DispatchConfig {
            shutdown_timeout_ms: 100,
            ..Default::default()
        };
        let (handle, mut producer) = start_scrolling(&history, Duration::from_millis(400), dispatch);

        for _ in 0..4 {
            producer.send(FrameObservation::gaze(Direction::Up)).await.unwrap();
        }
        drop(producer);

        let report = handle.stop(ShutdownMode::Drain).await.unwrap();
        assert_eq!(report.engine.frames_processed, 4);
        assert_eq!(report.dispatch.outcome, ShutdownOutcome::TimedOut);
        let stats = report.dispatch.stats;
        assert_eq!(stats.enqueued, report.engine.scrolls);
        // The first delivery outlasts the drain bound; the rest are discarded
        assert_eq!(stats.delivered, 0);
        assert!(stats.discarded >= 2);
    }
}
