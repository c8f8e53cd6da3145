// pouirup Pointer Gestures
// Secondary-button drag sessions sampled from cursor motion

use std::time::{Duration, Instant};

use crate::geometry::Position;
use crate::gesture::{Gesture, GestureRecognizer, GestureSession, GestureSource};
use crate::input::Button;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerConfig {
    pub enabled: bool,
    /// Minimum time between two samples fed to the recognizer
    pub sample_interval: Duration,
    /// Calibration from cursor pixels to recognizer length units
    pub pixels_per_unit: f64,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            sample_interval: Duration::from_secs(1) / 24,
            pixels_per_unit: 216.0,
        }
    }
}

/// What the shell must do with a button release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerRelease {
    /// Not part of a pointer gesture; let the event through
    Passthrough,
    /// Suppress the release and run the gesture's action
    Gesture(Gesture),
    /// Suppress the release and synthesize the original click
    Click(Button),
}

#[derive(Debug, Default)]
pub struct PointerGestureAdapter {
    config: PointerConfig,
    /// Last sample fed to the recognizer; `Some` only while this adapter
    /// owns the session
    reference: Option<(Position, Instant)>,
}

impl PointerGestureAdapter {
    pub fn new(config: PointerConfig) -> Self {
        Self {
            config,
            reference: None,
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.reference.is_some()
    }

    /// Returns `true` when the press started a session and must be suppressed.
    pub fn button_press(
        &mut self,
        recognizer: &GestureRecognizer,
        session: &mut GestureSession,
        button: Button,
        click_level: u32,
        position: Position,
        now: Instant,
    ) -> bool {
        if !self.config.enabled || button != Button::SECONDARY || click_level != 1 {
            return false;
        }
        if !recognizer.begin_session(session, GestureSource::Pointer) {
            return false;
        }
        self.reference = Some((position, now));
        true
    }

    pub fn cursor_move(
        &mut self,
        recognizer: &GestureRecognizer,
        session: &mut GestureSession,
        position: Position,
        now: Instant,
    ) {
        let Some((reference_position, reference_time)) = self.reference else {
            return;
        };
        if session.source() != Some(GestureSource::Pointer) {
            return;
        }

        let elapsed = now.saturating_duration_since(reference_time);
        if elapsed < self.config.sample_interval {
            return;
        }

        let displacement = (position - reference_position) / self.config.pixels_per_unit;
        self.reference = Some((position, now));
        recognizer.feed(session, displacement, elapsed.as_secs_f64());
    }

    pub fn button_release(
        &mut self,
        recognizer: &GestureRecognizer,
        session: &mut GestureSession,
        button: Button,
        click_level: u32,
    ) -> PointerRelease {
        if button != Button::SECONDARY || click_level != 1 || self.reference.is_none() {
            return PointerRelease::Passthrough;
        }
        self.reference = None;
        match recognizer.end_session(session) {
            Some(gesture) => PointerRelease::Gesture(gesture),
            None => PointerRelease::Click(button),
        }
    }
}
