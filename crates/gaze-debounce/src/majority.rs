//! Majority-vote direction debouncer
//!
//! Buffers paired observations in a sliding window. Once the window is full,
//! each frame re-evaluates the per-eye modal direction; a `Select` fires when
//! both eyes agree on an actionable direction with enough votes and the
//! cooldown has elapsed. Firing clears the window so the next judgement needs
//! a fresh full sample.

use gaze_window::BoundedWindow;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::{quorum, DebounceConfig};
use crate::event::ActionEvent;
use crate::observation::EyeObservation;
use crate::DebounceError;

/// Windowed both-eye consensus debouncer producing `Select` events
#[derive(Debug, Clone)]
pub struct MajorityVoteDebouncer {
    window: BoundedWindow<EyeObservation>,
    /// Minimum time between fires
    cooldown: Duration,
    /// Direction sensitivity in [0, 1]
    sensitivity: f64,
    /// Votes each eye's mode needs, derived from sensitivity
    quorum: usize,
    /// When the last `Select` fired
    last_fired_at: Option<Instant>,
}

impl MajorityVoteDebouncer {
    pub fn new(capacity: usize, sensitivity: f64, cooldown: Duration) -> Result<Self, DebounceError> {
        crate::config::validate_sensitivity("direction", sensitivity)?;
        let window = BoundedWindow::new(capacity)?;
        Ok(Self {
            quorum: quorum(capacity, sensitivity),
            window,
            cooldown,
            sensitivity,
            last_fired_at: None,
        })
    }

    pub fn from_config(config: &DebounceConfig) -> Result<Self, DebounceError> {
        Self::new(
            config.window_capacity,
            config.direction_sensitivity,
            config.cooldown(),
        )
    }

    /// Feed one frame's direction pair observed at `now`
    pub fn observe(&mut self, pair: EyeObservation, now: Instant) -> Option<ActionEvent> {
        self.window.push(pair);
        if !self.window.is_full() {
            return None;
        }

        let (left_mode, left_count) = self.window.majority_of(|o| o.left)?;
        let (right_mode, right_count) = self.window.majority_of(|o| o.right)?;

        if left_mode != right_mode {
            debug!("Eyes disagree: left={} right={}", left_mode, right_mode);
            return None;
        }
        let direction = left_mode.cardinal()?;
        if left_count < self.quorum || right_count < self.quorum {
            debug!(
                "Consensus {} below quorum: left={} right={} need={}",
                direction, left_count, right_count, self.quorum
            );
            return None;
        }
        if let Some(last) = self.last_fired_at {
            if now.saturating_duration_since(last) < self.cooldown {
                debug!("Select {} suppressed: in cooldown period", direction);
                return None;
            }
        }

        info!(
            "Selected {} (left={}/{}, right={}/{})",
            direction,
            left_count,
            self.window.capacity(),
            right_count,
            self.window.capacity()
        );
        self.last_fired_at = Some(now);
        self.window.clear();
        Some(ActionEvent::Select { direction })
    }

    /// Change sensitivity; takes effect on the next frame, window untouched
    pub fn set_sensitivity(&mut self, sensitivity: f64) -> Result<(), DebounceError> {
        crate::config::validate_sensitivity("direction", sensitivity)?;
        self.sensitivity = sensitivity;
        self.quorum = quorum(self.window.capacity(), sensitivity);
        debug!("Direction sensitivity set to {} (quorum {})", sensitivity, self.quorum);
        Ok(())
    }

    pub fn sensitivity(&self) -> f64 {
        self.sensitivity
    }

    pub fn quorum(&self) -> usize {
        self.quorum
    }

    pub fn window(&self) -> &BoundedWindow<EyeObservation> {
        &self.window
    }

    pub fn last_fired_at(&self) -> Option<Instant> {
        self.last_fired_at
    }

    /// Clear the window and forget the cooldown
    pub fn reset(&mut self) {
        self.window.clear();
        self.last_fired_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observation::{Cardinal, Direction};
    use proptest::prelude::*;

    const FRAME: Duration = Duration::from_millis(33);

    fn debouncer(capacity: usize, sensitivity: f64, cooldown_s: u64) -> MajorityVoteDebouncer {
        MajorityVoteDebouncer::new(capacity, sensitivity, Duration::from_secs(cooldown_s)).unwrap()
    }

    /// Feed frames at ~30fps starting from `start`, returning every event and the next timestamp
    fn feed(
        debouncer: &mut MajorityVoteDebouncer,
        frames: &[EyeObservation],
        start: Instant,
    ) -> (Vec<ActionEvent>, Instant) {
        let mut now = start;
        let mut events = Vec::new();
        for &frame in frames {
            if let Some(event) = debouncer.observe(frame, now) {
                events.push(event);
            }
            now += FRAME;
        }
        (events, now)
    }

    fn chat_batch() -> Vec<EyeObservation> {
        let mut frames = vec![EyeObservation::both(Direction::Right); 6];
        frames.extend(vec![EyeObservation::both(Direction::Middle); 4]);
        frames
    }

    #[test]
    fn test_chat_selection_scenario() {
        let mut debouncer = debouncer(10, 0.5, 3);
        assert_eq!(debouncer.quorum(), 5);

        let (events, next) = feed(&mut debouncer, &chat_batch(), Instant::now());
        assert_eq!(
            events,
            vec![ActionEvent::Select {
                direction: Cardinal::Right
            }]
        );
        assert!(debouncer.window().is_empty());

        // Same batch again, well inside the cooldown
        let (events, _) = feed(&mut debouncer, &chat_batch(), next);
        assert!(events.is_empty());
    }

    #[test]
    fn test_no_fire_before_window_full() {
        let mut debouncer = debouncer(15, 1.0, 0);
        let frames = vec![EyeObservation::both(Direction::Up); 14];

        let (events, _) = feed(&mut debouncer, &frames, Instant::now());
        assert!(events.is_empty());
        assert_eq!(debouncer.window().len(), 14);
    }

    #[test]
    fn test_neutral_and_unknown_consensus_never_fire() {
        for direction in [Direction::Middle, Direction::Unknown] {
            let mut debouncer = debouncer(5, 1.0, 0);
            let frames = vec![EyeObservation::both(direction); 20];
            let (events, _) = feed(&mut debouncer, &frames, Instant::now());
            assert!(events.is_empty());
        }
    }

    #[test]
    fn test_below_quorum_does_not_fire() {
        // quorum = ceil(10 * 0.8) = 8
        let mut debouncer = debouncer(10, 0.2, 0);
        let mut frames = chat_batch();
        frames.truncate(10);

        let (events, _) = feed(&mut debouncer, &frames, Instant::now());
        assert!(events.is_empty());
        // Window kept for continuous re-evaluation
        assert!(debouncer.window().is_full());
    }

    #[test]
    fn test_window_keeps_sliding_until_consensus() {
        // quorum = ceil(4 * 0.5) = 2
        let mut debouncer = debouncer(4, 0.5, 0);
        let middle = EyeObservation::both(Direction::Middle);
        let down = EyeObservation::both(Direction::Down);
        let start = Instant::now();

        let (events, next) = feed(&mut debouncer, &[middle, middle, middle, down], start);
        assert!(events.is_empty());

        // [middle, middle, down, down]: tie, middle encountered first
        let (events, next) = feed(&mut debouncer, &[down], next);
        assert!(events.is_empty());

        // [middle, down, down, down]
        let (events, _) = feed(&mut debouncer, &[down], next);
        assert_eq!(
            events,
            vec![ActionEvent::Select {
                direction: Cardinal::Down
            }]
        );
    }

    #[test]
    fn test_fires_again_after_cooldown() {
        let mut debouncer = debouncer(3, 0.5, 3);
        let up = vec![EyeObservation::both(Direction::Up); 3];
        let start = Instant::now();

        assert_eq!(feed(&mut debouncer, &up, start).0.len(), 1);
        assert_eq!(feed(&mut debouncer, &up, start + Duration::from_secs(1)).0.len(), 0);
        assert_eq!(feed(&mut debouncer, &up, start + Duration::from_secs(4)).0.len(), 1);
    }

    #[test]
    fn test_sensitivity_inversion_on_partial_agreement() {
        // 6/10 agreement: enough at 0.8 (quorum 2), not at 0.2 (quorum 8)
        let frames = chat_batch();
        let start = Instant::now();

        let mut strict = debouncer(10, 0.2, 3);
        let mut lenient = debouncer(10, 0.8, 3);

        assert_eq!(feed(&mut strict, &frames, start).0.len(), 0);
        assert_eq!(feed(&mut lenient, &frames, start).0.len(), 1);
    }

    #[test]
    fn test_set_sensitivity_recomputes_quorum() {
        let mut debouncer = debouncer(10, 0.2, 0);
        assert_eq!(debouncer.quorum(), 8);

        debouncer.set_sensitivity(0.5).unwrap();
        assert_eq!(debouncer.sensitivity(), 0.5);
        assert_eq!(debouncer.quorum(), 5);
        assert!(debouncer.set_sensitivity(-0.1).is_err());
        assert_eq!(debouncer.quorum(), 5);
    }

    #[test]
    fn test_reset_clears_window_and_cooldown() {
        let mut debouncer = debouncer(3, 0.5, 60);
        let up = vec![EyeObservation::both(Direction::Up); 3];
        let start = Instant::now();

        assert_eq!(feed(&mut debouncer, &up, start).0.len(), 1);
        debouncer.observe(EyeObservation::both(Direction::Up), start);
        debouncer.reset();

        assert!(debouncer.window().is_empty());
        assert_eq!(debouncer.last_fired_at(), None);
        assert_eq!(feed(&mut debouncer, &up, start + FRAME).0.len(), 1);
    }

    fn direction_strategy() -> impl Strategy<Value = Direction> {
        prop_oneof![
            Just(Direction::Middle),
            Just(Direction::Up),
            Just(Direction::Down),
            Just(Direction::Left),
            Just(Direction::Right),
            Just(Direction::Unknown),
        ]
    }

    /// Mostly agreeing eyes, so streams reach quorum often enough to matter
    fn pair_strategy() -> impl Strategy<Value = EyeObservation> {
        prop_oneof![
            3 => direction_strategy().prop_map(EyeObservation::both),
            1 => (direction_strategy(), direction_strategy()).prop_map(|(l, r)| EyeObservation::new(l, r)),
        ]
    }

    proptest! {
        #[test]
        fn prop_one_select_per_cooldown(
            capacity in 1usize..20,
            extra in 0usize..200,
            sensitivity in 0.0f64..=1.0,
        ) {
            // Whole stream spans far less than the 3s cooldown
            let mut debouncer = MajorityVoteDebouncer::new(
                capacity, sensitivity, Duration::from_secs(3),
            ).unwrap();
            let start = Instant::now();
            let mut fired = 0;
            for i in 0..capacity + extra {
                let now = start + Duration::from_millis(i as u64);
                if debouncer.observe(EyeObservation::both(Direction::Left), now).is_some() {
                    fired += 1;
                }
            }
            prop_assert_eq!(fired, 1);
        }

        #[test]
        fn prop_no_fire_on_short_stream(
            capacity in 2usize..30,
            frames in proptest::collection::vec((direction_strategy(), direction_strategy()), 0..30),
        ) {
            let mut debouncer = MajorityVoteDebouncer::new(capacity, 1.0, Duration::ZERO).unwrap();
            let start = Instant::now();
            for (left, right) in frames.into_iter().take(capacity - 1) {
                prop_assert!(debouncer.observe(EyeObservation::new(left, right), start).is_none());
            }
        }

        #[test]
        fn prop_disagreement_suppresses_firing(
            capacity in 1usize..20,
            frames in proptest::collection::vec((0usize..2, 0usize..2), 1..120),
            sensitivity in 0.0f64..=1.0,
        ) {
            // Left eye only ever sees up/left, right eye down/right: modes can never match
            let left_dirs = [Direction::Up, Direction::Left];
            let right_dirs = [Direction::Down, Direction::Right];
            let mut debouncer = MajorityVoteDebouncer::new(capacity, sensitivity, Duration::ZERO).unwrap();
            let start = Instant::now();
            for (l, r) in frames {
                let pair = EyeObservation::new(left_dirs[l], right_dirs[r]);
                prop_assert!(debouncer.observe(pair, start).is_none());
            }
        }

        #[test]
        fn prop_higher_sensitivity_never_fires_less(
            capacity in 1usize..20,
            frames in proptest::collection::vec((pair_strategy(), 0u64..=1500), 0..200),
        ) {
            let start = Instant::now();
            let mut now = start;
            let timed: Vec<_> = frames
                .into_iter()
                .map(|(pair, gap_ms)| {
                    now += Duration::from_millis(gap_ms);
                    (pair, now)
                })
                .collect();
            let count = |sensitivity: f64| {
                let mut debouncer =
                    MajorityVoteDebouncer::new(capacity, sensitivity, Duration::from_secs(3)).unwrap();
                timed.iter().filter(|&&(pair, at)| debouncer.observe(pair, at).is_some()).count()
            };
            prop_assert!(count(0.8) >= count(0.2));
        }
    }
}
