// pouirup Gesture Recognizer
// Turns (displacement, elapsed) samples into compass-direction tokens

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4, TAU};
use std::fmt;
use std::str::FromStr;

use smallvec::SmallVec;

use crate::geometry::Displacement;

/// A quantized compass direction. South is downward motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GestureMovement {
    East,
    South,
    West,
    North,
}

impl GestureMovement {
    /// Sector order after rotating the angle by +45°
    const SECTORS: [GestureMovement; 4] = [
        GestureMovement::East,
        GestureMovement::South,
        GestureMovement::West,
        GestureMovement::North,
    ];

    /// Quantize a displacement into one of four 90° sectors.
    ///
    /// The angle is rotated by +45° and reduced modulo 360°, then the sector
    /// is `floor(angle / 90°)`; a displacement exactly on a diagonal lands
    /// in the sector it enters, e.g. (1, 1) is South.
    pub fn from_displacement(displacement: Displacement) -> GestureMovement {
        let rotated = (displacement.angle() + FRAC_PI_4).rem_euclid(TAU);
        let sector = ((rotated / FRAC_PI_2).floor() as usize).min(3);
        Self::SECTORS[sector]
    }

    pub fn letter(self) -> char {
        match self {
            GestureMovement::East => 'E',
            GestureMovement::South => 'S',
            GestureMovement::West => 'W',
            GestureMovement::North => 'N',
        }
    }

    pub fn from_letter(letter: char) -> Option<GestureMovement> {
        match letter.to_ascii_uppercase() {
            'E' => Some(GestureMovement::East),
            'S' => Some(GestureMovement::South),
            'W' => Some(GestureMovement::West),
            'N' => Some(GestureMovement::North),
            _ => None,
        }
    }
}

/// Ordered sequence of recognized movements
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Gesture(SmallVec<[GestureMovement; 8]>);

impl Gesture {
    pub fn new() -> Self {
        Self(SmallVec::new())
    }

    pub fn push(&mut self, movement: GestureMovement) {
        self.0.push(movement);
    }

    pub fn last(&self) -> Option<GestureMovement> {
        self.0.last().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[GestureMovement] {
        &self.0
    }

    fn clear(&mut self) {
        self.0.clear();
    }
}

impl From<&[GestureMovement]> for Gesture {
    fn from(movements: &[GestureMovement]) -> Self {
        Self(movements.iter().copied().collect())
    }
}

impl fmt::Display for Gesture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for movement in &self.0 {
            write!(f, "{}", movement.letter())?;
        }
        Ok(())
    }
}

impl FromStr for Gesture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err("gesture cannot be empty".to_string());
        }
        trimmed
            .chars()
            .map(|c| {
                GestureMovement::from_letter(c)
                    .ok_or_else(|| format!("invalid gesture direction '{}' in '{}'", c, s))
            })
            .collect::<Result<SmallVec<_>, _>>()
            .map(Gesture)
    }
}

/// Motion source contributing to a gesture session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureSource {
    Pointer,
    Trackpad,
}

/// State of the single in-progress gesture.
///
/// Created once at engine start and only ever reset, never dropped.
#[derive(Debug, Clone, Default)]
pub struct GestureSession {
    source: Option<GestureSource>,
    recognized: Gesture,
    pending_movement: Option<GestureMovement>,
    pending_distance: f64,
    paused: bool,
}

impl GestureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<GestureSource> {
        self.source
    }

    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    pub fn recognized(&self) -> &Gesture {
        &self.recognized
    }

    pub fn pending_movement(&self) -> Option<GestureMovement> {
        self.pending_movement
    }

    pub fn pending_distance(&self) -> f64 {
        self.pending_distance
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    fn reset(&mut self) {
        self.source = None;
        self.recognized.clear();
        self.pending_movement = None;
        self.pending_distance = 0.0;
        self.paused = false;
    }
}

/// Recognizer thresholds, in length units (inches) and seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognizerConfig {
    /// Samples slower than this pause the gesture
    pub min_speed: f64,
    /// Distance a movement must cover before it is recognized
    pub min_distance: f64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            min_speed: 3.0,
            min_distance: 0.25,
        }
    }
}

/// Stateless recognizer; all state lives in [`GestureSession`].
#[derive(Debug, Clone, Copy, Default)]
pub struct GestureRecognizer {
    config: RecognizerConfig,
}

impl GestureRecognizer {
    pub fn new(config: RecognizerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RecognizerConfig {
        &self.config
    }

    /// Start a session for `source`. Refuses while another source is active.
    pub fn begin_session(&self, session: &mut GestureSession, source: GestureSource) -> bool {
        if session.source.is_some() {
            return false;
        }
        session.source = Some(source);
        log::debug!("gesture session started from {:?}", source);
        true
    }

    /// End the session, returning the gesture if anything was recognized.
    /// The session is reset either way.
    pub fn end_session(&self, session: &mut GestureSession) -> Option<Gesture> {
        let completed = if session.recognized.is_empty() {
            None
        } else {
            Some(session.recognized.clone())
        };
        if let Some(gesture) = &completed {
            log::debug!("gesture session ended with {}", gesture);
        }
        session.reset();
        completed
    }

    /// Feed one motion sample into the session.
    pub fn feed(&self, session: &mut GestureSession, displacement: Displacement, elapsed_secs: f64) {
        // zero-length intervals carry no speed information
        if elapsed_secs <= 0.0 || !elapsed_secs.is_finite() {
            return;
        }

        let distance = displacement.magnitude();
        let speed = distance / elapsed_secs;
        if speed < self.config.min_speed {
            if !session.recognized.is_empty() {
                session.paused = true;
            }
            return;
        }

        let movement = GestureMovement::from_displacement(displacement);

        if session.paused || session.pending_movement != Some(movement) {
            session.pending_movement = Some(movement);
            session.pending_distance = 0.0;
        }
        session.pending_distance += distance;

        if !session.paused && session.recognized.last() == Some(movement) {
            return;
        }

        if session.pending_distance >= self.config.min_distance {
            session.recognized.push(movement);
            session.paused = false;
            log::trace!("gesture so far: {}", session.recognized);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Vector2;

    fn active_session() -> (GestureRecognizer, GestureSession) {
        let recognizer = GestureRecognizer::default();
        let mut session = GestureSession::new();
        assert!(recognizer.begin_session(&mut session, GestureSource::Trackpad));
        (recognizer, session)
    }

    #[test]
    fn test_direction_quantization() {
        use GestureMovement::*;
        assert_eq!(GestureMovement::from_displacement(Vector2::new(0.0, -5.0)), North);
        assert_eq!(GestureMovement::from_displacement(Vector2::new(5.0, 0.0)), East);
        assert_eq!(GestureMovement::from_displacement(Vector2::new(0.0, 5.0)), South);
        assert_eq!(GestureMovement::from_displacement(Vector2::new(-5.0, 0.0)), West);
    }

    #[test]
    fn test_diagonal_enters_next_sector() {
        use GestureMovement::*;
        assert_eq!(GestureMovement::from_displacement(Vector2::new(1.0, 1.0)), South);
        assert_eq!(GestureMovement::from_displacement(Vector2::new(1.0, -1.0)), East);
        assert_eq!(GestureMovement::from_displacement(Vector2::new(-1.0, -1.0)), North);
    }

    #[test]
    fn test_slow_sample_emits_nothing() {
        let (recognizer, mut session) = active_session();
        // 0.2 units over 0.1s = 2 units/s
        recognizer.feed(&mut session, Vector2::new(0.2, 0.0), 0.1);
        assert!(session.recognized().is_empty());
        assert!(!session.is_paused());
        assert_eq!(session.pending_movement(), None);
    }

    #[test]
    fn test_slow_sample_pauses_non_empty_gesture() {
        let (recognizer, mut session) = active_session();
        recognizer.feed(&mut session, Vector2::new(10.0, 0.0), 0.1);
        recognizer.feed(&mut session, Vector2::new(0.1, 0.0), 0.1);
        assert_eq!(session.recognized().to_string(), "E");
        assert!(session.is_paused());
    }

    #[test]
    fn test_same_direction_run_appends_once() {
        let (recognizer, mut session) = active_session();
        for _ in 0..20 {
            recognizer.feed(&mut session, Vector2::new(1.0, 0.0), 0.1);
        }
        assert_eq!(session.recognized().to_string(), "E");
    }

    #[test]
    fn test_short_movements_accumulate() {
        let (recognizer, mut session) = active_session();
        // 0.1 units per sample at 4 units/s; recognized on the third sample
        recognizer.feed(&mut session, Vector2::new(0.0, 0.1), 0.025);
        recognizer.feed(&mut session, Vector2::new(0.0, 0.1), 0.025);
        assert!(session.recognized().is_empty());
        recognizer.feed(&mut session, Vector2::new(0.0, 0.1), 0.025);
        assert_eq!(session.recognized().to_string(), "S");
    }

    #[test]
    fn test_direction_change_resets_pending_distance() {
        let (recognizer, mut session) = active_session();
        recognizer.feed(&mut session, Vector2::new(0.2, 0.0), 0.05);
        assert_eq!(session.pending_distance(), 0.2);
        recognizer.feed(&mut session, Vector2::new(0.0, 0.2), 0.05);
        assert_eq!(session.pending_movement(), Some(GestureMovement::South));
        assert_eq!(session.pending_distance(), 0.2);
        assert!(session.recognized().is_empty());
    }

    #[test]
    fn test_pause_allows_repeating_direction() {
        let (recognizer, mut session) = active_session();
        recognizer.feed(&mut session, Vector2::new(1.0, 0.0), 0.1);
        recognizer.feed(&mut session, Vector2::new(0.0, 0.0), 0.1);
        recognizer.feed(&mut session, Vector2::new(1.0, 0.0), 0.1);
        assert_eq!(session.recognized().to_string(), "EE");
        assert!(!session.is_paused());
    }

    #[test]
    fn test_zero_elapsed_is_ignored() {
        let (recognizer, mut session) = active_session();
        recognizer.feed(&mut session, Vector2::new(1.0, 0.0), 0.0);
        assert!(session.recognized().is_empty());
        assert_eq!(session.pending_movement(), None);
    }

    #[test]
    fn test_begin_twice_refused() {
        let recognizer = GestureRecognizer::default();
        let mut session = GestureSession::new();
        assert!(recognizer.begin_session(&mut session, GestureSource::Pointer));
        assert!(!recognizer.begin_session(&mut session, GestureSource::Trackpad));
        assert_eq!(session.source(), Some(GestureSource::Pointer));
    }

    #[test]
    fn test_end_session_resets() {
        let (recognizer, mut session) = active_session();
        recognizer.feed(&mut session, Vector2::new(10.0, 0.0), 0.1);
        recognizer.feed(&mut session, Vector2::new(0.0, 10.0), 0.1);
        let gesture = recognizer.end_session(&mut session).unwrap();
        assert_eq!(gesture.to_string(), "ES");
        assert_eq!(session.source(), None);
        assert!(session.recognized().is_empty());
        assert_eq!(session.pending_movement(), None);
        assert_eq!(session.pending_distance(), 0.0);
        assert!(!session.is_paused());
        assert_eq!(recognizer.end_session(&mut session), None);
    }

    #[test]
    fn test_gesture_parse() {
        let gesture: Gesture = "esWn".parse().unwrap();
        assert_eq!(gesture.to_string(), "ESWN");
        assert!("".parse::<Gesture>().is_err());
        assert!("EX".parse::<Gesture>().is_err());
    }
}
