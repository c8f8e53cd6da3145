// pouirup Input Layer - Hook Events
// Event vocabulary the input hook delivers to the engine

use std::collections::HashMap;
use std::time::{Duration, Instant};

use strum_macros::IntoStaticStr;

use crate::geometry::{Displacement, Position};
use crate::remap::EngineError;
use crate::Key;

/// Presses of the same button closer than this raise the click level
pub const CLICK_INTERVAL: Duration = Duration::from_millis(400);

/// A mouse button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Button {
    Left,
    Right,
    Middle,
    Side,
    Extra,
}

impl Button {
    /// The button that starts pointer gestures
    pub const SECONDARY: Button = Button::Right;

    /// BTN_* code from input-event-codes.h
    pub fn code(self) -> u16 {
        match self {
            Button::Left => 0x110,
            Button::Right => 0x111,
            Button::Middle => 0x112,
            Button::Side => 0x113,
            Button::Extra => 0x114,
        }
    }

    pub fn from_code(code: u16) -> Option<Button> {
        match code {
            0x110 => Some(Button::Left),
            0x111 => Some(Button::Right),
            0x112 => Some(Button::Middle),
            0x113 => Some(Button::Side),
            0x114 => Some(Button::Extra),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        self.into()
    }
}

/// Multitouch tracking id of a finger on a touchpad
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FingerId(pub i32);

/// Finger positions in inches, keyed by tracking id
pub type FingerPositions = HashMap<FingerId, Position>;

/// One event delivered by the input hook.
#[derive(Debug, Clone, PartialEq)]
pub enum HookEvent {
    KeyPress { key: Key, native_repeat: bool },
    KeyRelease { key: Key },
    /// `position` is the cursor position sampled by the hook at press time
    ButtonPress {
        button: Button,
        click_level: u32,
        position: Position,
    },
    ButtonRelease { button: Button, click_level: u32 },
    CursorMove { position: Position },
    WheelScroll {
        delta: Displacement,
        continuous: bool,
        momentum: bool,
    },
    FingerPositions(FingerPositions),
}

impl HookEvent {
    /// Whether the hook honors a suppression decision for this event
    pub fn is_suppressible(&self) -> bool {
        !matches!(
            self,
            HookEvent::CursorMove { .. } | HookEvent::FingerPositions(_)
        )
    }
}

/// Receiver of hook events.
pub trait HookHandler {
    /// Returns whether the event is suppressed. The answer is ignored for
    /// events that cannot be suppressed.
    fn handle(&mut self, event: HookEvent, now: Instant) -> Result<bool, EngineError>;
}

/// Derives click levels from button presses.
///
/// A press of the same button within [`CLICK_INTERVAL`] of the previous
/// press raises the level; anything else starts over at 1.
#[derive(Debug, Default)]
pub struct ClickCounter {
    last_press: Option<(Button, Instant)>,
    level: u32,
}

impl ClickCounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a press and return its click level
    pub fn press(&mut self, button: Button, now: Instant) -> u32 {
        self.level = match self.last_press {
            Some((last, at)) if last == button && now.duration_since(at) < CLICK_INTERVAL => {
                self.level + 1
            }
            _ => 1,
        };
        self.last_press = Some((button, now));
        self.level
    }

    /// Click level reported with a release: that of the button's latest press
    pub fn release(&self, button: Button) -> u32 {
        match self.last_press {
            Some((last, _)) if last == button => self.level,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_button_codes() {
        assert_eq!(Button::from_code(0x111), Some(Button::Right));
        assert_eq!(Button::Middle.code(), 0x112);
        assert_eq!(Button::from_code(0x120), None);
        assert_eq!(Button::SECONDARY.name(), "right");
    }

    #[test]
    fn test_click_counter_double_click() {
        let mut counter = ClickCounter::new();
        let t0 = Instant::now();
        assert_eq!(counter.press(Button::Left, t0), 1);
        assert_eq!(counter.release(Button::Left), 1);
        assert_eq!(counter.press(Button::Left, t0 + Duration::from_millis(150)), 2);
        assert_eq!(counter.release(Button::Left), 2);
    }

    #[test]
    fn test_click_counter_resets() {
        let mut counter = ClickCounter::new();
        let t0 = Instant::now();
        counter.press(Button::Left, t0);
        assert_eq!(counter.press(Button::Right, t0 + Duration::from_millis(50)), 1);
        assert_eq!(counter.press(Button::Right, t0 + Duration::from_millis(600)), 1);
        assert_eq!(counter.release(Button::Left), 1);
    }

    #[test]
    fn test_suppressible_events() {
        assert!(HookEvent::KeyRelease { key: Key::A }.is_suppressible());
        assert!(!HookEvent::CursorMove {
            position: Position::ZERO
        }
        .is_suppressible());
    }
}
