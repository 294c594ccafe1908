//! Gesture engine combining the direction strategy with blink hysteresis

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

use crate::blink::{BlinkHysteresis, Latch};
use crate::config::{DebounceConfig, Strategy};
use crate::event::ActionEvent;
use crate::majority::MajorityVoteDebouncer;
use crate::observation::FrameObservation;
use crate::run_length::RunLengthDebouncer;
use crate::DebounceError;

/// Selected direction debouncer
#[derive(Debug, Clone)]
enum DirectionDebouncer {
    MajorityVote(MajorityVoteDebouncer),
    RunLength(RunLengthDebouncer),
}

/// Engine counters, reset with the session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineStats {
    pub frames_processed: u64,
    pub events_emitted: u64,
    pub selects: u64,
    pub scrolls: u64,
    pub blinks: u64,
    /// Blink confirmations deferred by a same-frame direction event
    pub blinks_deferred: u64,
}

impl EngineStats {
    fn record(&mut self, event: &ActionEvent) {
        self.events_emitted += 1;
        match event {
            ActionEvent::Select { .. } => self.selects += 1,
            ActionEvent::Scroll { .. } => self.scrolls += 1,
            ActionEvent::BlinkConfirmed => self.blinks += 1,
        }
    }
}

/// Session-scoped gesture engine.
///
/// Every frame goes through both the direction debouncer and the blink
/// hysteresis; at most one event leaves per frame. A blink confirmation that
/// coincides with a direction event is held and emitted on the next frame
/// that produces nothing else.
#[derive(Debug, Clone)]
pub struct GestureEngine {
    config: DebounceConfig,
    direction: DirectionDebouncer,
    blink: BlinkHysteresis,
    pending_blinks: u32,
    stats: EngineStats,
}

impl GestureEngine {
    /// Create an engine, rejecting invalid configuration up front
    pub fn new(config: DebounceConfig) -> Result<Self, DebounceError> {
        config.validate()?;

        let direction = match config.strategy {
            Strategy::MajorityVote => {
                DirectionDebouncer::MajorityVote(MajorityVoteDebouncer::from_config(&config)?)
            }
            Strategy::RunLength => DirectionDebouncer::RunLength(RunLengthDebouncer::from_config(&config)),
        };
        let blink = BlinkHysteresis::from_config(&config)?;

        info!(
            "Gesture engine created: strategy={:?}, window={}, cooldown={}s",
            config.strategy, config.window_capacity, config.cooldown_seconds
        );

        Ok(Self {
            config,
            direction,
            blink,
            pending_blinks: 0,
            stats: EngineStats::default(),
        })
    }

    /// Process one frame observed at `now`
    pub fn process(&mut self, frame: FrameObservation, now: Instant) -> Option<ActionEvent> {
        self.stats.frames_processed += 1;

        let direction_event = match &mut self.direction {
            DirectionDebouncer::MajorityVote(debouncer) => debouncer.observe(frame.eyes, now),
            DirectionDebouncer::RunLength(debouncer) => debouncer.observe(frame.eyes),
        };
        if self.blink.observe(frame.blink).is_some() {
            self.pending_blinks += 1;
        }

        let event = match direction_event {
            Some(event) => {
                if self.pending_blinks > 0 {
                    debug!("Deferring blink confirmation behind {}", event.kind());
                    self.stats.blinks_deferred += 1;
                }
                Some(event)
            }
            None if self.pending_blinks > 0 => {
                self.pending_blinks -= 1;
                Some(ActionEvent::BlinkConfirmed)
            }
            None => None,
        };

        if let Some(event) = &event {
            self.stats.record(event);
        }
        event
    }

    /// Recalibrate: clear windows, counters, and latches in place
    pub fn reset(&mut self) {
        match &mut self.direction {
            DirectionDebouncer::MajorityVote(debouncer) => debouncer.reset(),
            DirectionDebouncer::RunLength(debouncer) => debouncer.reset(),
        }
        self.blink.reset();
        self.pending_blinks = 0;
        self.stats = EngineStats::default();
        info!("Gesture engine reset");
    }

    /// Change direction sensitivity for subsequent frames
    pub fn set_direction_sensitivity(&mut self, sensitivity: f64) -> Result<(), DebounceError> {
        if let DirectionDebouncer::MajorityVote(debouncer) = &mut self.direction {
            debouncer.set_sensitivity(sensitivity)?;
        } else {
            crate::config::validate_sensitivity("direction", sensitivity)?;
        }
        self.config.direction_sensitivity = sensitivity;
        Ok(())
    }

    /// Change blink sensitivity for subsequent frames
    pub fn set_blink_sensitivity(&mut self, sensitivity: f64) -> Result<(), DebounceError> {
        self.blink.set_sensitivity(sensitivity)?;
        self.config.blink_sensitivity = sensitivity;
        Ok(())
    }

    /// Effective configuration, including live sensitivity changes
    pub fn config(&self) -> &DebounceConfig {
        &self.config
    }

    pub fn strategy(&self) -> Strategy {
        self.config.strategy
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn blink_latch(&self) -> Latch {
        self.blink.latch()
    }

    /// Frames buffered in the direction window (run-length mode has none)
    pub fn direction_window_len(&self) -> usize {
        match &self.direction {
            DirectionDebouncer::MajorityVote(debouncer) => debouncer.window().len(),
            DirectionDebouncer::RunLength(_) => 0,
        }
    }
}
