// pouirup Key Transitions
// The value carried by an EV_KEY event, in both directions

use crate::input::HookEvent;
use crate::Key;

/// Transition of a key or button.
///
/// Matches the kernel encoding: 0 release, 1 press, 2 auto-repeat.
/// Buttons never repeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i32)]
pub enum Action {
    Release = 0,
    Press = 1,
    Repeat = 2,
}

impl Action {
    pub fn from_value(value: i32) -> Option<Self> {
        match value {
            0 => Some(Action::Release),
            1 => Some(Action::Press),
            2 => Some(Action::Repeat),
            _ => None,
        }
    }

    pub fn from_pressed(pressed: bool) -> Self {
        if pressed {
            Action::Press
        } else {
            Action::Release
        }
    }

    pub fn value(self) -> i32 {
        self as i32
    }

    /// New held state after this transition; `None` leaves it unchanged
    pub fn held_after(self) -> Option<bool> {
        match self {
            Action::Press => Some(true),
            Action::Release => Some(false),
            Action::Repeat => None,
        }
    }

    /// The hook event for a keyboard key making this transition.
    /// Kernel auto-repeat arrives as a press flagged `native_repeat`.
    pub fn key_event(self, key: Key) -> HookEvent {
        match self {
            Action::Release => HookEvent::KeyRelease { key },
            Action::Press | Action::Repeat => HookEvent::KeyPress {
                key,
                native_repeat: self == Action::Repeat,
            },
        }
    }
}
