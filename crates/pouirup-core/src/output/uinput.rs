// pouirup uinput Output
// Virtual device creation and event emission

use std::collections::HashSet;

use evdev::uinput::VirtualDeviceBuilder;
use evdev::{AttributeSet, EventType, InputEvent, RelativeAxisType};

use super::{OutputError, OutputSink};
use crate::action::Action;
use crate::input::Button;
use crate::Key;

/// Highest key code advertised by the virtual device (covers KEY_FN)
const MAX_KEY_CODE: u16 = 0x1ff;

/// Virtual uinput device carrying both synthesized and forwarded input.
pub struct VirtualDevice {
    device: evdev::uinput::VirtualDevice,
    pressed: HashSet<u16>,
}

impl VirtualDevice {
    /// Create a new virtual device with keys, mouse buttons and relative axes
    pub fn new() -> Result<Self, OutputError> {
        let mut keys = AttributeSet::<evdev::Key>::new();
        for code in 1..=MAX_KEY_CODE {
            keys.insert(evdev::Key::new(code));
        }

        let mut axes = AttributeSet::<RelativeAxisType>::new();
        for axis in [
            RelativeAxisType::REL_X,
            RelativeAxisType::REL_Y,
            RelativeAxisType::REL_WHEEL,
            RelativeAxisType::REL_HWHEEL,
            RelativeAxisType::REL_WHEEL_HI_RES,
            RelativeAxisType::REL_HWHEEL_HI_RES,
        ] {
            axes.insert(axis);
        }

        let creation = |e: std::io::Error| OutputError::DeviceCreation(e.to_string());
        let device = VirtualDeviceBuilder::new()
            .map_err(creation)?
            .name("pouirup (virtual) input")
            .with_keys(&keys)
            .map_err(creation)?
            .with_relative_axes(&axes)
            .map_err(creation)?
            .build()
            .map_err(creation)?;

        log::info!("created virtual input device");
        Ok(Self {
            device,
            pressed: HashSet::new(),
        })
    }

    fn write_code(&mut self, code: u16, action: Action) -> Result<(), OutputError> {
        let event = InputEvent::new(EventType::KEY, code, action.value());
        // the kernel only processes the batch after a SYN_REPORT
        let syn = InputEvent::new(EventType::SYNCHRONIZATION, 0, 0);
        self.device
            .emit(&[event, syn])
            .map_err(|e: std::io::Error| OutputError::Write(e.to_string()))?;

        self.track(code, action);
        log::trace!("uinput code={} {:?}", code, action);
        Ok(())
    }

    fn track(&mut self, code: u16, action: Action) {
        match action.held_after() {
            Some(true) => {
                self.pressed.insert(code);
            }
            Some(false) => {
                self.pressed.remove(&code);
            }
            None => {}
        }
    }

    /// Pass raw events from a physical device through unchanged
    pub fn forward(&mut self, events: &[InputEvent]) -> Result<(), OutputError> {
        if events.is_empty() {
            return Ok(());
        }
        for event in events {
            if event.event_type() == EventType::KEY {
                if let Some(action) = Action::from_value(event.value()) {
                    self.track(event.code(), action);
                }
            }
        }
        self.device
            .emit(events)
            .map_err(|e: std::io::Error| OutputError::Write(e.to_string()))
    }

    /// Release every key and button still held (for shutdown/deactivation)
    pub fn release_all(&mut self) -> Result<(), OutputError> {
        let mut codes: Vec<u16> = self.pressed.iter().copied().collect();
        // non-modifiers first so no stray shortcut fires on the way out
        codes.sort_by_key(|code| (Key(*code).is_modifier(), *code));
        for code in codes {
            self.write_code(code, Action::Release)?;
        }
        Ok(())
    }
}

impl OutputSink for VirtualDevice {
    fn key_press(&mut self, key: Key) -> Result<(), OutputError> {
        self.write_code(key.code(), Action::Press)
    }

    fn key_release(&mut self, key: Key) -> Result<(), OutputError> {
        self.write_code(key.code(), Action::Release)
    }

    fn key_repeat(&mut self, key: Key) -> Result<(), OutputError> {
        self.write_code(key.code(), Action::Repeat)
    }

    fn button_press(&mut self, button: Button) -> Result<(), OutputError> {
        self.write_code(button.code(), Action::Press)
    }

    fn button_release(&mut self, button: Button) -> Result<(), OutputError> {
        self.write_code(button.code(), Action::Release)
    }

    fn set_key_physical_state(&mut self, key: Key, pressed: bool) -> Result<(), OutputError> {
        self.write_code(key.code(), Action::from_pressed(pressed))
    }
}

impl Drop for VirtualDevice {
    fn drop(&mut self) {
        if let Err(e) = self.release_all() {
            log::warn!("failed to release held keys: {}", e);
        }
    }
}
