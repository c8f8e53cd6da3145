// pouirup Gesture Scenarios
//
// Recognizer and adapter behavior driven through the public API with
// hand-made motion samples.

use std::time::{Duration, Instant};

use pouirup_core::gesture::{
    PointerConfig, PointerGestureAdapter, PointerRelease, TrackpadConfig, TrackpadGestureAdapter,
};
use pouirup_core::input::{FingerId, FingerPositions};
use pouirup_core::{
    Button, Gesture, GestureMovement, GestureRecognizer, GestureSession, GestureSource, Position,
    Vector2,
};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn started(source: GestureSource) -> (GestureRecognizer, GestureSession) {
    let recognizer = GestureRecognizer::default();
    let mut session = GestureSession::new();
    assert!(recognizer.begin_session(&mut session, source));
    (recognizer, session)
}

fn gesture(letters: &str) -> Gesture {
    letters.parse().unwrap()
}

#[test]
fn quantization_covers_the_compass() {
    use GestureMovement::*;
    let cases = [
        (Vector2::new(3.0, 0.5), East),
        (Vector2::new(0.5, 3.0), South),
        (Vector2::new(-3.0, -0.5), West),
        (Vector2::new(-0.5, -3.0), North),
        (Vector2::new(2.0, 2.0), South),
    ];
    for (displacement, expected) in cases {
        assert_eq!(GestureMovement::from_displacement(displacement), expected, "{:?}", displacement);
    }
}

#[test]
fn right_then_down_is_es() {
    let (recognizer, mut session) = started(GestureSource::Trackpad);
    recognizer.feed(&mut session, Vector2::new(1.0, 0.0), 0.1);
    recognizer.feed(&mut session, Vector2::new(0.0, 1.0), 0.1);
    assert_eq!(recognizer.end_session(&mut session), Some(gesture("ES")));
    assert!(!session.is_active());
}

#[test]
fn a_run_in_one_direction_yields_one_token() {
    let (recognizer, mut session) = started(GestureSource::Trackpad);
    for _ in 0..6 {
        recognizer.feed(&mut session, Vector2::new(0.5, 0.05), 0.05);
    }
    assert_eq!(session.recognized().to_string(), "E");
}

#[test]
fn short_samples_accumulate_to_the_distance_threshold() {
    let (recognizer, mut session) = started(GestureSource::Trackpad);
    recognizer.feed(&mut session, Vector2::new(0.1, 0.0), 0.01);
    recognizer.feed(&mut session, Vector2::new(0.1, 0.0), 0.01);
    assert!(session.recognized().is_empty());
    assert_eq!(session.pending_movement(), Some(GestureMovement::East));
    recognizer.feed(&mut session, Vector2::new(0.1, 0.0), 0.01);
    assert_eq!(session.recognized().to_string(), "E");
}

#[test]
fn direction_change_restarts_the_pending_distance() {
    let (recognizer, mut session) = started(GestureSource::Trackpad);
    recognizer.feed(&mut session, Vector2::new(0.2, 0.0), 0.01);
    recognizer.feed(&mut session, Vector2::new(0.0, 0.2), 0.01);
    assert!(session.recognized().is_empty());
    assert!((session.pending_distance() - 0.2).abs() < 1e-9);
}

#[test]
fn pause_allows_repeating_a_direction() {
    let (recognizer, mut session) = started(GestureSource::Trackpad);
    recognizer.feed(&mut session, Vector2::new(1.0, 0.0), 0.1);
    // slower than min_speed
    recognizer.feed(&mut session, Vector2::new(0.05, 0.0), 0.1);
    assert!(session.is_paused());
    recognizer.feed(&mut session, Vector2::new(1.0, 0.0), 0.1);
    assert_eq!(session.recognized().to_string(), "EE");
    assert!(!session.is_paused());
}

#[test]
fn zero_elapsed_sample_is_ignored() {
    let (recognizer, mut session) = started(GestureSource::Trackpad);
    recognizer.feed(&mut session, Vector2::new(5.0, 0.0), 0.0);
    assert!(session.recognized().is_empty());
    assert_eq!(session.pending_movement(), None);
}

#[test]
fn only_one_session_at_a_time() {
    let (recognizer, mut session) = started(GestureSource::Pointer);
    assert!(!recognizer.begin_session(&mut session, GestureSource::Trackpad));
    assert_eq!(session.source(), Some(GestureSource::Pointer));
    assert_eq!(recognizer.end_session(&mut session), None);
    assert!(recognizer.begin_session(&mut session, GestureSource::Trackpad));
}

#[test]
fn gesture_letters_parse_case_insensitively() {
    assert_eq!(gesture("es"), gesture("ES"));
    assert_eq!(gesture("NW").len(), 2);
    assert!("EX".parse::<Gesture>().is_err());
    assert!("".parse::<Gesture>().is_err());
}

fn pointer() -> PointerGestureAdapter {
    PointerGestureAdapter::new(PointerConfig {
        enabled: true,
        ..PointerConfig::default()
    })
}

#[test]
fn secondary_drag_recognizes_and_suppresses() {
    let recognizer = GestureRecognizer::default();
    let mut session = GestureSession::new();
    let mut adapter = pointer();
    let t0 = Instant::now();

    assert!(adapter.button_press(&recognizer, &mut session, Button::Right, 1, Position::ZERO, t0));
    // inside the sample interval: ignored, the reference stays put
    adapter.cursor_move(&recognizer, &mut session, Position::new(100.0, 0.0), t0 + ms(10));
    adapter.cursor_move(&recognizer, &mut session, Position::new(216.0, 0.0), t0 + ms(50));
    adapter.cursor_move(&recognizer, &mut session, Position::new(216.0, 216.0), t0 + ms(100));

    assert_eq!(
        adapter.button_release(&recognizer, &mut session, Button::Right, 1),
        PointerRelease::Gesture(gesture("ES"))
    );
    assert!(!session.is_active());
}

#[test]
fn secondary_tap_replays_a_click() {
    let recognizer = GestureRecognizer::default();
    let mut session = GestureSession::new();
    let mut adapter = pointer();
    let t0 = Instant::now();

    assert!(adapter.button_press(&recognizer, &mut session, Button::Right, 1, Position::ZERO, t0));
    // slow drift
    adapter.cursor_move(&recognizer, &mut session, Position::new(2.0, 1.0), t0 + ms(200));
    assert_eq!(
        adapter.button_release(&recognizer, &mut session, Button::Right, 1),
        PointerRelease::Click(Button::Right)
    );
}

#[test]
fn double_click_is_not_a_gesture() {
    let recognizer = GestureRecognizer::default();
    let mut session = GestureSession::new();
    let mut adapter = pointer();
    let t0 = Instant::now();
    assert!(!adapter.button_press(&recognizer, &mut session, Button::Right, 2, Position::ZERO, t0));
    assert_eq!(
        adapter.button_release(&recognizer, &mut session, Button::Right, 2),
        PointerRelease::Passthrough
    );
}

fn fingers(count: i32, x: f64, y: f64) -> FingerPositions {
    (0..count)
        .map(|i| (FingerId(i), Position::new(x + i as f64 * 0.4, y)))
        .collect()
}

#[test]
fn four_finger_swipe_left() {
    let recognizer = GestureRecognizer::default();
    let mut session = GestureSession::new();
    let mut adapter = TrackpadGestureAdapter::new(TrackpadConfig::default());
    let t0 = Instant::now();

    assert_eq!(adapter.fingers_update(&recognizer, &mut session, fingers(4, 2.0, 1.0), t0), None);
    assert!(!adapter.is_tracking());
    assert_eq!(
        adapter.fingers_update(&recognizer, &mut session, fingers(4, 1.5, 1.0), t0 + ms(50)),
        None
    );
    assert!(adapter.is_tracking());
    assert_eq!(adapter.tracking_fingers().len(), 4);
    assert_eq!(session.source(), Some(GestureSource::Trackpad));

    let completed = adapter.fingers_update(&recognizer, &mut session, FingerPositions::new(), t0 + ms(80));
    assert_eq!(completed, Some(gesture("W")));
    assert!(!adapter.is_tracking());
    assert!(!session.is_active());
}

#[test]
fn three_fingers_do_not_start_a_session() {
    let recognizer = GestureRecognizer::default();
    let mut session = GestureSession::new();
    let mut adapter = TrackpadGestureAdapter::new(TrackpadConfig::default());
    let t0 = Instant::now();

    adapter.fingers_update(&recognizer, &mut session, fingers(3, 2.0, 1.0), t0);
    adapter.fingers_update(&recognizer, &mut session, fingers(3, 1.0, 1.0), t0 + ms(50));
    assert!(!adapter.is_tracking());
    assert!(!session.is_active());
}

#[test]
fn pointer_session_blocks_trackpad() {
    let recognizer = GestureRecognizer::default();
    let (_, mut session) = started(GestureSource::Pointer);
    let mut adapter = TrackpadGestureAdapter::new(TrackpadConfig::default());
    let t0 = Instant::now();

    adapter.fingers_update(&recognizer, &mut session, fingers(4, 2.0, 1.0), t0);
    adapter.fingers_update(&recognizer, &mut session, fingers(4, 1.0, 1.0), t0 + ms(50));
    assert!(!adapter.is_tracking());
    assert_eq!(session.source(), Some(GestureSource::Pointer));
}

#[test]
fn tracking_set_is_fixed_at_session_start() {
    let recognizer = GestureRecognizer::default();
    let mut session = GestureSession::new();
    let mut adapter = TrackpadGestureAdapter::new(TrackpadConfig::default());
    let t0 = Instant::now();

    adapter.fingers_update(&recognizer, &mut session, fingers(4, 2.0, 1.0), t0);
    adapter.fingers_update(&recognizer, &mut session, fingers(4, 1.5, 1.0), t0 + ms(50));
    let mut joined = fingers(4, 1.0, 1.0);
    joined.insert(FingerId(9), Position::new(3.0, 2.0));
    adapter.fingers_update(&recognizer, &mut session, joined, t0 + ms(100));
    assert_eq!(
        adapter.tracking_fingers(),
        &[FingerId(0), FingerId(1), FingerId(2), FingerId(3)]
    );

    // the newcomer alone does not keep the session alive
    let mut lifted = FingerPositions::new();
    lifted.insert(FingerId(9), Position::new(3.0, 2.0));
    assert_eq!(
        adapter.fingers_update(&recognizer, &mut session, lifted, t0 + ms(130)),
        Some(gesture("W"))
    );
}
