// pouirup Remap Scenarios
//
// Whole typing sequences through a layout loaded from TOML, checked against
// the exact stream of synthesized events.

use std::sync::Arc;
use std::time::{Duration, Instant};

use pouirup_core::config::Config;
use pouirup_core::output::{shared_output, OutputEvent, RecordingOutput};
use pouirup_core::remap::{KeyRemapper, ManualScheduler};
use pouirup_core::{Key, ModifierId};

use OutputEvent::{KeyPhysical, KeyPress, KeyRelease, KeyRepeat};

const LAYOUT: &str = r#"
[general]
quit_key = "none"
mask_key = "f13"

[keyboard]
shift_locked = ["q"]

[keyboard.normal]
q = "q"
"1" = "Shift-1"

[keyboard.shifted]
q = "Shift-q"
"1" = "1"

[[keyboard.execution]]
key = "capslock"
action = { type = "modifier", modifier = "Ctrl", tap = "esc", sticky = true }

[[keyboard.execution]]
key = "left_shift"
action = { type = "modifier", modifier = "Shift", sticky = true }

[[keyboard.execution]]
key = "right_alt"
action = { type = "modifier", modifier = "Fn", tap = "enter" }

[[keyboard.execution]]
key = "space"
action = { type = "modifier", modifier = "Shift", tap = "space", sticky = true }

[[keyboard.function]]
key = "h"
repeat = true
action = { type = "key", key = "left" }

[[keyboard.function]]
key = "d"
action = { type = "sequence", combos = ["Home", "Shift-End", "Delete"] }

[[keyboard.function]]
key = "w"
repeat = true
action = { type = "combo", combo = "Ctrl-Right" }

[[keyboard.function]]
key = "tab"
action = { type = "toggle_shift_lock" }
"#;

fn key(name: &str) -> Key {
    name.parse().unwrap()
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

struct Harness {
    remapper: KeyRemapper,
    out: RecordingOutput,
    scheduler: Arc<ManualScheduler>,
    t0: Instant,
}

impl Harness {
    fn new() -> Self {
        let config = Config::from_toml(LAYOUT).unwrap();
        let out = RecordingOutput::new();
        let scheduler = Arc::new(ManualScheduler::new());
        let remapper = KeyRemapper::new(
            Arc::clone(&config.layout),
            config.remap,
            shared_output(out.clone()),
            scheduler.clone(),
        );
        Self {
            remapper,
            out,
            scheduler,
            t0: Instant::now(),
        }
    }

    fn press(&self, name: &str, at_ms: u64) {
        self.remapper.press(key(name), false, self.t0 + ms(at_ms)).unwrap();
    }

    fn repeat(&self, name: &str, at_ms: u64) {
        self.remapper.press(key(name), true, self.t0 + ms(at_ms)).unwrap();
    }

    fn release(&self, name: &str, at_ms: u64) {
        self.remapper.release(key(name), self.t0 + ms(at_ms)).unwrap();
    }
}

#[test]
fn unmapped_key_passes_through_once() {
    let h = Harness::new();
    h.press("z", 0);
    h.release("z", 30);
    assert_eq!(h.out.events(), vec![KeyPress(key("z")), KeyRelease(key("z"))]);
    assert!(h.remapper.pressed_modifiers().is_empty());
}

#[test]
fn character_needing_shift_engages_it_around_the_key() {
    let h = Harness::new();
    h.press("1", 0);
    h.release("1", 40);
    assert_eq!(
        h.out.events(),
        vec![
            KeyPress(Key::LEFT_SHIFT),
            KeyPress(key("1")),
            KeyRelease(Key::LEFT_SHIFT),
            KeyRelease(key("1")),
        ]
    );
}

#[test]
fn held_shift_is_lifted_for_an_unshifted_output() {
    let h = Harness::new();
    h.press("left_shift", 0);
    h.press("1", 50);
    h.release("1", 80);
    h.release("left_shift", 1500);
    assert_eq!(
        h.out.events(),
        vec![
            KeyPress(Key::LEFT_SHIFT),
            KeyRelease(Key::LEFT_SHIFT),
            KeyPress(key("1")),
            KeyPress(Key::LEFT_SHIFT),
            KeyRelease(key("1")),
            KeyRelease(Key::LEFT_SHIFT),
        ]
    );
}

#[test]
fn function_layer_arrow_with_repeat() {
    let h = Harness::new();
    h.press("right_alt", 0);
    h.press("h", 20);
    h.repeat("h", 520);
    h.repeat("h", 550);
    h.release("h", 560);
    h.release("right_alt", 600);
    // Fn is virtual: nothing reaches the host for it, and no Enter tap
    // because h interleaved
    assert_eq!(
        h.out.events(),
        vec![
            KeyPress(key("left")),
            KeyRepeat(key("left")),
            KeyRepeat(key("left")),
            KeyRelease(key("left")),
        ]
    );
}

#[test]
fn function_layer_combo_repeats_inside_its_modifiers() {
    let h = Harness::new();
    h.press("right_alt", 0);
    h.press("w", 20);
    h.repeat("w", 520);
    h.release("w", 560);
    h.release("right_alt", 600);
    assert_eq!(
        h.out.events(),
        vec![
            KeyPress(Key::LEFT_CTRL),
            KeyPress(key("right")),
            KeyRelease(Key::LEFT_CTRL),
            KeyPress(Key::LEFT_CTRL),
            KeyRepeat(key("right")),
            KeyRelease(Key::LEFT_CTRL),
            KeyRelease(key("right")),
        ]
    );
}

#[test]
fn native_repeat_of_character_auto_repeats() {
    let h = Harness::new();
    h.press("q", 0);
    h.repeat("q", 500);
    h.repeat("q", 530);
    h.release("q", 540);
    assert_eq!(
        h.out.events(),
        vec![
            KeyPress(key("q")),
            KeyRepeat(key("q")),
            KeyRepeat(key("q")),
            KeyRelease(key("q")),
        ]
    );
}

#[test]
fn tapping_function_key_alone_sends_its_alternate() {
    let h = Harness::new();
    h.press("right_alt", 0);
    h.release("right_alt", 90);
    assert_eq!(h.out.events(), vec![KeyPress(Key::ENTER), KeyRelease(Key::ENTER)]);
}

#[test]
fn function_layer_sequence_and_combo() {
    let h = Harness::new();
    h.press("right_alt", 0);
    h.press("d", 20);
    h.release("d", 40);
    assert_eq!(
        h.out.take(),
        vec![
            KeyPress(key("home")),
            KeyRelease(key("home")),
            KeyPress(Key::LEFT_SHIFT),
            KeyPress(key("end")),
            KeyRelease(Key::LEFT_SHIFT),
            KeyRelease(key("end")),
            KeyPress(key("delete")),
            KeyRelease(key("delete")),
        ]
    );

    h.press("w", 60);
    h.release("w", 80);
    h.release("right_alt", 100);
    assert_eq!(
        h.out.take(),
        vec![
            KeyPress(Key::LEFT_CTRL),
            KeyPress(key("right")),
            KeyRelease(Key::LEFT_CTRL),
            KeyRelease(key("right")),
        ]
    );
}

#[test]
fn second_tap_of_layer_action_is_not_swallowed() {
    let h = Harness::new();
    h.press("right_alt", 0);
    h.press("d", 10);
    h.release("d", 20);
    h.press("d", 30);
    h.release("d", 40);
    h.release("right_alt", 50);
    let deletes = h
        .out
        .events()
        .into_iter()
        .filter(|e| *e == KeyPress(key("delete")))
        .count();
    assert_eq!(deletes, 2);
}

#[test]
fn shift_lock_toggles_locked_keys_only() {
    let h = Harness::new();
    h.press("right_alt", 0);
    h.press("tab", 10);
    h.release("tab", 20);
    h.release("right_alt", 30);
    assert!(h.out.take().is_empty());
    assert!(h.remapper.state().shift_lock());

    h.press("q", 100);
    h.release("q", 120);
    assert_eq!(
        h.out.take(),
        vec![
            KeyPress(Key::LEFT_SHIFT),
            KeyPress(key("q")),
            KeyRelease(Key::LEFT_SHIFT),
            KeyRelease(key("q")),
        ]
    );

    // "1" is not locked and still maps through the normal table
    h.press("1", 200);
    h.release("1", 220);
    assert_eq!(h.out.take()[1], KeyPress(key("1")));
}

#[test]
fn dual_role_held_past_threshold_acts_as_modifier() {
    let h = Harness::new();
    h.press("capslock", 0);
    h.press("z", 100);
    h.release("z", 130);
    h.release("capslock", 150);
    assert_eq!(
        h.out.events(),
        vec![
            KeyPress(Key::LEFT_CTRL),
            KeyPress(key("z")),
            KeyRelease(key("z")),
            KeyRelease(Key::LEFT_CTRL),
        ]
    );
    assert_eq!(h.scheduler.pending_count(), 0);
}

#[test]
fn sticky_latch_then_expiry_releases_latched_modifiers() {
    let h = Harness::new();
    h.press("capslock", 0);
    h.release("capslock", 400);
    assert_eq!(h.out.take(), vec![KeyPress(Key::LEFT_CTRL)]);
    assert_eq!(h.scheduler.pending_delays(), vec![ms(2000)]);

    h.scheduler.run_all();
    assert_eq!(
        h.out.take(),
        vec![
            KeyPhysical { key: Key::F13, pressed: true },
            KeyPhysical { key: Key::F13, pressed: false },
            KeyRelease(Key::LEFT_CTRL),
        ]
    );
    assert!(h.remapper.pressed_modifiers().is_empty());
}

#[test]
fn stacked_stickies_release_together() {
    let h = Harness::new();
    h.press("capslock", 0);
    h.release("capslock", 400);
    // once latched, a quick continuous press also latches
    h.press("left_shift", 450);
    h.release("left_shift", 500);
    let mods = h.remapper.pressed_modifiers();
    assert!(mods.contains(ModifierId::Ctrl) && mods.contains(ModifierId::Shift));
    assert_eq!(h.scheduler.pending_count(), 2);
    h.out.take();

    h.press("z", 700);
    let events = h.out.take();
    assert_eq!(events[0], KeyPress(key("z")));
    assert_eq!(events[1], KeyPhysical { key: Key::F13, pressed: true });
    assert!(events.contains(&KeyRelease(Key::LEFT_CTRL)));
    assert!(events.contains(&KeyRelease(Key::LEFT_SHIFT)));
    assert!(h.remapper.pressed_modifiers().is_empty());

    // both timers find nothing left to do
    h.scheduler.run_all();
    assert!(h.out.events().is_empty());
}

#[test]
fn newer_dual_role_press_supersedes_pending_expiry() {
    let h = Harness::new();
    h.press("capslock", 0);
    h.release("capslock", 400);
    h.press("space", 600);
    h.out.take();

    assert_eq!(h.scheduler.run_all(), 1);
    assert!(h.out.events().is_empty());
    assert!(h.remapper.pressed_modifiers().contains(ModifierId::Ctrl));
}

#[test]
fn hold_beyond_max_sticky_does_not_latch() {
    let h = Harness::new();
    h.press("space", 0);
    h.release("space", 1200);
    assert_eq!(
        h.out.events(),
        vec![KeyPress(Key::LEFT_SHIFT), KeyRelease(Key::LEFT_SHIFT)]
    );
    assert_eq!(h.scheduler.pending_count(), 0);
}
