// pouirup Trackpad Gestures
// Multi-finger swipes sampled from touchpad finger positions

use std::time::{Duration, Instant};

use smallvec::SmallVec;

use crate::geometry::Vector2;
use crate::gesture::{Gesture, GestureRecognizer, GestureSession, GestureSource};
use crate::input::{FingerId, FingerPositions};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackpadConfig {
    pub enabled: bool,
    pub sample_interval: Duration,
    /// Fingers that must be moving together to start a session
    pub min_fingers: usize,
    /// Speed a finger needs to count towards `min_fingers`
    pub min_finger_speed: f64,
}

impl Default for TrackpadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sample_interval: Duration::from_secs(1) / 24,
            min_fingers: 4,
            min_finger_speed: 3.0,
        }
    }
}

#[derive(Debug, Default)]
pub struct TrackpadGestureAdapter {
    config: TrackpadConfig,
    previous: FingerPositions,
    previous_time: Option<Instant>,
    current: FingerPositions,
    /// Fingers fixed at session start; empty when no trackpad session
    tracking: SmallVec<[FingerId; 5]>,
}

impl TrackpadGestureAdapter {
    pub fn new(config: TrackpadConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn is_tracking(&self) -> bool {
        !self.tracking.is_empty()
    }

    pub fn tracking_fingers(&self) -> &[FingerId] {
        &self.tracking
    }

    /// Handle a new set of finger positions.
    ///
    /// Returns the completed gesture when the last tracked finger lifts and
    /// something was recognized.
    pub fn fingers_update(
        &mut self,
        recognizer: &GestureRecognizer,
        session: &mut GestureSession,
        fingers: FingerPositions,
        now: Instant,
    ) -> Option<Gesture> {
        if !self.config.enabled {
            return None;
        }
        self.current = fingers;

        if self.is_tracking() {
            let any_left = self.tracking.iter().any(|f| self.current.contains_key(f));
            if !any_left {
                self.tracking.clear();
                return recognizer.end_session(session);
            }
            self.sample(recognizer, session, now);
            return None;
        }

        if session.is_active() {
            return None;
        }
        if self.current.len() >= self.config.min_fingers {
            self.sample(recognizer, session, now);
        }
        None
    }

    fn sample(&mut self, recognizer: &GestureRecognizer, session: &mut GestureSession, now: Instant) {
        let elapsed = match self.previous_time {
            Some(at) => now.saturating_duration_since(at),
            None => {
                self.previous = self.current.clone();
                self.previous_time = Some(now);
                return;
            }
        };
        if elapsed < self.config.sample_interval {
            return;
        }
        let elapsed_secs = elapsed.as_secs_f64();

        let previous = std::mem::replace(&mut self.previous, self.current.clone());
        self.previous_time = Some(now);

        if !self.is_tracking() {
            let mut qualifying: SmallVec<[FingerId; 5]> = self
                .current
                .iter()
                .filter_map(|(id, position)| {
                    let before = previous.get(id)?;
                    let speed = (*position - *before).magnitude() / elapsed_secs;
                    (speed >= self.config.min_finger_speed).then_some(*id)
                })
                .collect();
            if qualifying.len() < self.config.min_fingers {
                return;
            }
            if !recognizer.begin_session(session, GestureSource::Trackpad) {
                return;
            }
            qualifying.sort();
            log::debug!("trackpad session tracking fingers {:?}", qualifying);
            self.tracking = qualifying;
        }

        let displacements = self.tracking.iter().filter_map(|id| {
            let now_at = self.current.get(id)?;
            let before = previous.get(id)?;
            Some(*now_at - *before)
        });
        if let Some(mean) = Vector2::mean(displacements) {
            recognizer.feed(session, mean, elapsed_secs);
        }
    }
}
