// pouirup Input Layer - Device Detection
// Capability analysis deciding which role an input device plays

use std::collections::HashSet;

use strum_macros::{Display, EnumString};

/// Name prefix of the virtual output device, never opened as input
pub const VIRTUAL_DEVICE_PREFIX: &str = "pouirup (virtual)";

const BTN_LEFT: u16 = 0x110;
const BTN_TOOL_FINGER: u16 = 0x145;

// QWERTY row key codes: Q, W, E, R, T, Y
const QWERTY_CODES: &[u16] = &[16, 17, 18, 19, 20, 21];

// SPACE, A, Z
const A_Z_SPACE_CODES: &[u16] = &[57, 30, 44];

/// Role of an input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum DeviceKind {
    Keyboard,
    Mouse,
    Touchpad,
}

/// Device capabilities extracted from evdev
#[derive(Debug, Clone, Default)]
pub struct DeviceCapabilities {
    /// Supported EV_KEY codes (keys and buttons)
    pub keys: HashSet<u16>,
    /// REL_X and REL_Y present
    pub relative_motion: bool,
    /// ABS_MT_POSITION_X and ABS_MT_POSITION_Y present
    pub multitouch: bool,
    /// INPUT_PROP_DIRECT, set on touchscreens
    pub direct: bool,
}

impl DeviceCapabilities {
    pub fn with_keys<I: IntoIterator<Item = u16>>(keys: I) -> Self {
        Self {
            keys: keys.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn supports_key(&self, code: u16) -> bool {
        self.keys.contains(&code)
    }

    /// A full alphabetic keyboard: the QWERTY row plus A, Z and SPACE
    pub fn is_keyboard(&self) -> bool {
        QWERTY_CODES.iter().all(|c| self.keys.contains(c))
            && A_Z_SPACE_CODES.iter().all(|c| self.keys.contains(c))
    }

    /// An indirect multitouch surface reporting finger tools
    pub fn is_touchpad(&self) -> bool {
        self.multitouch && !self.direct && self.supports_key(BTN_TOOL_FINGER)
    }

    pub fn is_mouse(&self) -> bool {
        self.relative_motion && self.supports_key(BTN_LEFT)
    }

    /// Keyboard wins over touchpad, touchpad over mouse
    pub fn classify(&self) -> Option<DeviceKind> {
        if self.is_keyboard() {
            Some(DeviceKind::Keyboard)
        } else if self.is_touchpad() {
            Some(DeviceKind::Touchpad)
        } else if self.is_mouse() {
            Some(DeviceKind::Mouse)
        } else {
            None
        }
    }
}

/// Whether `name` belongs to our own virtual output device
pub fn is_virtual_device(name: &str) -> bool {
    name.starts_with(VIRTUAL_DEVICE_PREFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keyboard() -> DeviceCapabilities {
        let mut keys: Vec<u16> = QWERTY_CODES.to_vec();
        keys.extend_from_slice(A_Z_SPACE_CODES);
        keys.extend_from_slice(&[14, 15, 28, 29, 42, 56]);
        DeviceCapabilities::with_keys(keys)
    }

    #[test]
    fn test_keyboard_detection() {
        assert_eq!(keyboard().classify(), Some(DeviceKind::Keyboard));

        let partial = DeviceCapabilities::with_keys(QWERTY_CODES.iter().copied());
        assert!(!partial.is_keyboard());
    }

    #[test]
    fn test_mouse_detection() {
        let mut caps = DeviceCapabilities::with_keys([BTN_LEFT, BTN_LEFT + 1]);
        assert_eq!(caps.classify(), None);
        caps.relative_motion = true;
        assert_eq!(caps.classify(), Some(DeviceKind::Mouse));
    }

    #[test]
    fn test_touchpad_versus_touchscreen() {
        let mut caps = DeviceCapabilities::with_keys([BTN_LEFT, BTN_TOOL_FINGER]);
        caps.multitouch = true;
        assert_eq!(caps.classify(), Some(DeviceKind::Touchpad));

        caps.direct = true;
        assert_eq!(caps.classify(), None);
    }

    #[test]
    fn test_keyboard_with_pointer_stays_keyboard() {
        let mut caps = keyboard();
        caps.keys.insert(BTN_LEFT);
        caps.relative_motion = true;
        assert_eq!(caps.classify(), Some(DeviceKind::Keyboard));
    }

    #[test]
    fn test_virtual_device_name() {
        assert!(is_virtual_device("pouirup (virtual) input"));
        assert!(!is_virtual_device("Logitech USB Keyboard"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DeviceKind::Touchpad.to_string(), "touchpad");
        assert_eq!("mouse".parse::<DeviceKind>().unwrap(), DeviceKind::Mouse);
    }
}
