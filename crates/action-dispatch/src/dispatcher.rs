//! Bounded, non-blocking action dispatcher

use chrono::Local;
use gaze_debounce::ActionEvent;
use metrics::{counter, gauge};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::sink::{PhraseSource, ScrollSink, SelectionSink};
use crate::{DispatchError, SinkError};

/// Chat timestamp format
const TIME_FORMAT: &str = "%H:%M:%S";

/// Dispatcher configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Undelivered events kept before the oldest is dropped
    pub backlog: usize,
    /// Bound on draining at shutdown (milliseconds)
    pub shutdown_timeout_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            backlog: 8,
            shutdown_timeout_ms: 500,
        }
    }
}

impl DispatchConfig {
    pub fn validate(&self) -> Result<(), DispatchError> {
        if self.backlog < 1 {
            return Err(DispatchError::InvalidBacklog(self.backlog));
        }
        Ok(())
    }
}

/// External collaborators receiving actions
#[derive(Clone)]
pub struct DispatchSinks {
    pub scroll: Arc<dyn ScrollSink>,
    pub selection: Arc<dyn SelectionSink>,
    pub phrases: Arc<dyn PhraseSource>,
}

/// Result of a non-blocking enqueue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Enqueue {
    Accepted,
    /// Backlog was full; the oldest undelivered event was dropped
    Displaced(ActionEvent),
}

/// What to do with undelivered events at shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShutdownMode {
    /// Deliver the backlog, bounded by the shutdown timeout
    #[default]
    Drain,
    /// Drop the backlog
    Discard,
}

/// Delivery counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchStats {
    pub enqueued: u64,
    pub delivered: u64,
    pub failed: u64,
    pub dropped: u64,
    pub discarded: u64,
}

/// How the worker ended at shutdown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownOutcome {
    #[default]
    Completed,
    /// The drain overran the shutdown timeout; the rest was discarded
    TimedOut,
    /// The worker task panicked or was cancelled
    WorkerFailed,
}

/// Final counters plus how the worker stopped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchSummary {
    #[serde(flatten)]
    pub stats: DispatchStats,
    pub outcome: ShutdownOutcome,
}

#[derive(Default)]
struct Counters {
    enqueued: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    discarded: AtomicU64,
}

struct Shared {
    queue: Mutex<VecDeque<ActionEvent>>,
    notify: Notify,
    closed: AtomicBool,
    counters: Counters,
}

/// Dispatcher owning a worker task that delivers queued actions.
///
/// `dispatch` only takes a short lock on the queue, so the frame loop never
/// waits on a sink.
pub struct ActionDispatcher {
    shared: Arc<Shared>,
    backlog: usize,
    shutdown_timeout: Duration,
    worker: Option<JoinHandle<()>>,
}

impl ActionDispatcher {
    /// Spawn the delivery worker on the current tokio runtime
    pub fn spawn(config: &DispatchConfig, sinks: DispatchSinks) -> Result<Self, DispatchError> {
        config.validate()?;

        let shared = Arc::new(Shared {
            queue: Mutex::new(VecDeque::with_capacity(config.backlog)),
            notify: Notify::new(),
            closed: AtomicBool::new(false),
            counters: Counters::default(),
        });
        let worker = tokio::spawn(run_worker(Arc::clone(&shared), sinks));

        info!("Action dispatcher started (backlog={})", config.backlog);
        Ok(Self {
            shared,
            backlog: config.backlog,
            shutdown_timeout: Duration::from_millis(config.shutdown_timeout_ms),
            worker: Some(worker),
        })
    }

    /// Queue an event for delivery without waiting on any sink
    pub fn dispatch(&self, event: ActionEvent) -> Enqueue {
        let (displaced, depth) = {
            let mut queue = self.shared.queue.lock();
            queue.push_back(event);
            let displaced = if queue.len() > self.backlog {
                queue.pop_front()
            } else {
                None
            };
            (displaced, queue.len())
        };
        self.shared.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        gauge!("gaze_dispatch_backlog").set(depth as f64);
        self.shared.notify.notify_one();

        match displaced {
            Some(old) => {
                self.shared.counters.dropped.fetch_add(1, Ordering::Relaxed);
                counter!("gaze_dispatch_dropped_total").increment(1);
                warn!("Dispatch backlog full, dropped undelivered {}", old.kind());
                Enqueue::Displaced(old)
            }
            None => Enqueue::Accepted,
        }
    }

    /// Events waiting for delivery
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    pub fn stats(&self) -> DispatchStats {
        let c = &self.shared.counters;
        DispatchStats {
            enqueued: c.enqueued.load(Ordering::Relaxed),
            delivered: c.delivered.load(Ordering::Relaxed),
            failed: c.failed.load(Ordering::Relaxed),
            dropped: c.dropped.load(Ordering::Relaxed),
            discarded: c.discarded.load(Ordering::Relaxed),
        }
    }

    /// Stop the worker, draining or discarding the backlog, and wait for it.
    ///
    /// If the drain exceeds the shutdown timeout the worker is aborted and
    /// whatever remains queued is discarded, so nothing is delivered late.
    /// The counters are reported whichever way the worker ended.
    pub async fn shutdown(mut self, mode: ShutdownMode) -> DispatchSummary {
        if mode == ShutdownMode::Discard {
            self.discard_backlog();
        }
        self.shared.closed.store(true, Ordering::Release);
        self.shared.notify.notify_one();

        let mut outcome = ShutdownOutcome::Completed;
        if let Some(mut worker) = self.worker.take() {
            match tokio::time::timeout(self.shutdown_timeout, &mut worker).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    self.discard_backlog();
                    warn!("Dispatch worker failed: {}", e);
                    outcome = ShutdownOutcome::WorkerFailed;
                }
                Err(_) => {
                    worker.abort();
                    self.discard_backlog();
                    warn!("Dispatcher drain timed out after {:?}", self.shutdown_timeout);
                    outcome = ShutdownOutcome::TimedOut;
                }
            }
        }

        let stats = self.stats();
        info!(
            "Action dispatcher stopped ({:?}): delivered={}, failed={}, dropped={}, discarded={}",
            outcome, stats.delivered, stats.failed, stats.dropped, stats.discarded
        );
        DispatchSummary { stats, outcome }
    }

    fn discard_backlog(&self) {
        let discarded = self.shared.queue.lock().drain(..).count() as u64;
        if discarded > 0 {
            debug!("Discarding {} undelivered actions", discarded);
            self.shared.counters.discarded.fetch_add(discarded, Ordering::Relaxed);
        }
        gauge!("gaze_dispatch_backlog").set(0.0);
    }
}

impl Drop for ActionDispatcher {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            worker.abort();
        }
    }
}

async fn run_worker(shared: Arc<Shared>, sinks: DispatchSinks) {
    loop {
        let next = shared.queue.lock().pop_front();
        match next {
            Some(event) => match deliver_blocking(&sinks, event).await {
                Ok(()) => {
                    shared.counters.delivered.fetch_add(1, Ordering::Relaxed);
                    counter!("gaze_actions_delivered_total", "kind" => event.kind()).increment(1);
                    debug!("Delivered {:?}", event);
                }
                Err(e) => {
                    // The decision to fire stands; only delivery is reported
                    shared.counters.failed.fetch_add(1, Ordering::Relaxed);
                    counter!("gaze_dispatch_failures_total", "kind" => event.kind()).increment(1);
                    warn!("Failed to deliver {}: {}", event.kind(), e);
                }
            },
            None => {
                if shared.closed.load(Ordering::Acquire) {
                    break;
                }
                shared.notify.notified().await;
            }
        }
    }
    debug!("Dispatch worker exited");
}

/// Sinks are synchronous and may block (input injection, file writes), so
/// they run on the blocking pool instead of a runtime worker thread.
async fn deliver_blocking(sinks: &DispatchSinks, event: ActionEvent) -> Result<(), SinkError> {
    let sinks = sinks.clone();
    tokio::task::spawn_blocking(move || deliver(&sinks, event))
        .await
        .map_err(|e| SinkError::Rejected(format!("delivery task failed: {e}")))?
}

fn deliver(sinks: &DispatchSinks, event: ActionEvent) -> Result<(), SinkError> {
    match event {
        ActionEvent::Scroll { axis, ticks } => sinks.scroll.scroll(axis, ticks),
        ActionEvent::Select { direction } => {
            let text = sinks
                .phrases
                .resolve(direction)
                .ok_or(SinkError::Unresolved(direction))?;
            let timestamp = Local::now().format(TIME_FORMAT).to_string();
            sinks.selection.append(text, timestamp)
        }
        ActionEvent::BlinkConfirmed => sinks.phrases.advance(),
    }
}
