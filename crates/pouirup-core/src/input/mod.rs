// pouirup Input Layer
// Hook events, device detection and the evdev hook

mod device;
mod event;
mod filter;
#[cfg(feature = "pure-rust")]
mod hook;
mod multitouch;

pub use device::{is_virtual_device, DeviceCapabilities, DeviceKind, VIRTUAL_DEVICE_PREFIX};
pub use event::{Button, ClickCounter, FingerId, FingerPositions, HookEvent, HookHandler, CLICK_INTERVAL};
pub use filter::matches_device_filter;
#[cfg(feature = "pure-rust")]
pub use hook::{DeviceInfo, DeviceUse, HookError, HookOptions, InputHook};
pub use multitouch::MultitouchDecoder;
